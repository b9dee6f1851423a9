use crate::config::{ChatConfig, SessionContext};
use crate::conversation::ChatView;
use crate::error::ChatError;
use crate::export::{export_table, run_plan};
use crate::gateway::{BotGateway, RestGateway};
use crate::interpreter::{plan_download, EXPORT_FILENAME, EXPORT_SHEET};
use crate::nav::Nav;
use crate::session::{self, Applied, ChatSession, Notice};
use crate::state::{sort_summaries, ConversationSummary, Record};
use crate::store::{self, ConversationStore};
use crate::toast::{push_notice, Toasts};
use leptos::logging::{error, log, warn};
use leptos::*;
use std::rc::Rc;

const DOWNLOADED: &str = "Excel file downloaded!";

#[component]
pub fn App() -> impl IntoView {
    let origin = window().location().origin().ok();
    let config = ChatConfig::from_env(origin.as_deref());
    let context = Rc::new(SessionContext::from_local_storage());
    let store: Rc<dyn ConversationStore> = store::from_config(&config);
    let gateway: Rc<dyn BotGateway> = Rc::new(RestGateway::from_config(&config));
    log!(
        "Order assistant on {} ({:?})",
        config.api_base,
        config.persistence_mode
    );

    let session = create_rw_signal(ChatSession::default());
    let summaries = create_rw_signal(Vec::<ConversationSummary>::new());
    let toasts = create_rw_signal(Vec::<Notice>::new());
    let input = create_rw_signal(String::new());

    let set_summaries = move |mut list: Vec<ConversationSummary>| {
        sort_summaries(&mut list);
        summaries.set(list);
    };

    let reload = {
        let store = store.clone();
        move || {
            let store = store.clone();
            spawn_local(async move {
                match store.list().await {
                    Ok(list) => set_summaries(list),
                    Err(err) => warn!("Could not list conversations: {err}"),
                }
            });
        }
    };
    reload();

    let on_submit = {
        let store = store.clone();
        let config = config.clone();
        Callback::new(move |text: String| {
            let outgoing = match session.try_update(|s| s.begin_submit(&text)) {
                Some(Ok(outgoing)) => outgoing,
                Some(Err(ChatError::EmptyInput)) | None => return,
                Some(Err(err)) => {
                    push_notice(toasts, Notice::from(&err));
                    return;
                }
            };
            input.set(String::new());
            let store = store.clone();
            let gateway = gateway.clone();
            let context = context.clone();
            let config = config.clone();
            spawn_local(async move {
                let mut result =
                    session::exchange(&*store, &*gateway, &context, &config, &outgoing).await;
                if let Some(list) = result.summaries.take() {
                    set_summaries(list);
                }
                for notice in result.notices.drain(..) {
                    push_notice(toasts, notice);
                }
                session.update(|s| {
                    s.finish_submit(outgoing.ticket, result);
                });
            });
        })
    };

    let on_select_conv = {
        let store = store.clone();
        move |id: String| {
            let Some(ticket) = session.try_update(|s| s.begin_load()) else {
                return;
            };
            let store = store.clone();
            spawn_local(async move {
                match session::load(&*store, &id).await {
                    Ok(conversation) => {
                        let applied = session
                            .try_update(|s| s.finish_load(ticket, conversation))
                            .unwrap_or(Applied::Stale);
                        if applied == Applied::Stale {
                            log!("Ignoring late load of {id}");
                        }
                    }
                    Err(err) => {
                        warn!("Could not load {id}: {err}");
                        push_notice(toasts, Notice::from(&err));
                    }
                }
            });
        }
    };

    let new_session = move || {
        session.update(|s| s.new_session());
        input.set(String::new());
    };

    let pick_intent = move |text: String| input.set(text);

    let on_download = {
        let config = config.clone();
        Callback::new(move |index: usize| {
            let Some(message) = session.with_untracked(|s| s.messages.get(index).cloned()) else {
                return;
            };
            let plan = match plan_download(&message, &config) {
                Ok(plan) => plan,
                Err(err) => {
                    push_notice(toasts, Notice::from(&err));
                    return;
                }
            };
            spawn_local(async move {
                match run_plan(plan).await {
                    Ok(filename) => {
                        log!("Saved {filename}");
                        push_notice(toasts, Notice::success(DOWNLOADED));
                    }
                    Err(err) => {
                        error!("Download failed: {err}");
                        push_notice(toasts, Notice::from(&err));
                    }
                }
            });
        })
    };

    let on_export = Callback::new(move |records: Vec<Record>| {
        match export_table(&records, EXPORT_FILENAME, EXPORT_SHEET) {
            Ok(()) => push_notice(toasts, Notice::success(DOWNLOADED)),
            Err(err) => {
                error!("Export failed: {err}");
                push_notice(toasts, Notice::from(&err));
            }
        }
    });

    let active = Signal::derive(move || session.with(|s| s.conversation_id.clone()));
    let show_intents = config.enable_suggestions;

    view! {
        <div class="flex flex-row">
            <Nav summaries active show_intents on_select_conv new_session pick_intent />
            <ChatView session input config on_submit on_download on_export />
            <Toasts toasts />
        </div>
    }
}
