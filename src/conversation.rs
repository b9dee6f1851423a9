use crate::config::ChatConfig;
use crate::interpreter::download_anchor;
use crate::loading::Loading;
use crate::message::MessageView;
use crate::session::{ChatSession, ViewState};
use crate::state::Record;
use crate::suggestions;
use leptos::leptos_dom::ev::SubmitEvent;
use leptos::*;

#[component]
pub fn ChatView(
    session: RwSignal<ChatSession>,
    input: RwSignal<String>,
    config: ChatConfig,
    #[prop(into)] on_submit: Callback<String>,
    #[prop(into)] on_download: Callback<usize>,
    #[prop(into)] on_export: Callback<Vec<Record>>,
) -> impl IntoView {
    let pending = create_memo(move |_| session.with(|s| s.state() == ViewState::AwaitingReply));
    let (focused, set_focused) = create_signal(false);
    let show_suggestions = config.enable_suggestions;
    let matches = create_memo(move |_| {
        if show_suggestions && focused.get() {
            input.with(|text| suggestions::filter(text))
        } else {
            vec![]
        }
    });

    let update_message = move |ev| {
        input.set(event_target_value(&ev));
    };
    let send_message = move |ev: SubmitEvent| {
        ev.prevent_default();
        on_submit.call(input.get_untracked());
    };
    let on_button = Callback::new(move |payload: String| on_submit.call(payload));

    let messages = move || {
        let config = config.clone();
        session.with(|s| {
            let anchor = download_anchor(&s.messages);
            s.messages
                .iter()
                .enumerate()
                .filter(|(_, message)| message.is_visible())
                .rev()
                .map(|(index, message)| {
                    view! {
                        <MessageView
                            message=message.clone()
                            index=index
                            config=config.clone()
                            show_download=anchor == Some(index)
                            on_button=on_button
                            on_download=on_download
                            on_export=on_export
                        />
                    }
                })
                .collect::<Vec<_>>()
        })
    };

    view! {
        <div class="h-dvh max-h-dvh grow flex flex-col scrollbar lg:w-4/5 w-screen max-w-screen">
            <main class="grow flex flex-col-reverse overflow-auto max-h-screen">
                {move || pending.get().then(|| view! { <div class="m-5"><Loading /></div> })}
                {messages}
            </main>
            <form class="w-full relative" on:submit=send_message>
                <label for="chat" class="sr-only">
                    Your message
                </label>
                {move || {
                    let found = matches.get();
                    (!found.is_empty())
                        .then(|| {
                            let items = found
                                .into_iter()
                                .map(|suggestion| {
                                    view! {
                                        <li
                                            class="px-4 py-2 text-sm text-left cursor-pointer hover:bg-gray-100 dark:hover:bg-gray-600"
                                            on:mousedown=move |ev| {
                                                ev.prevent_default();
                                                input.set(suggestion.to_string());
                                                set_focused.set(false);
                                            }
                                        >
                                            {suggestion}
                                        </li>
                                    }
                                })
                                .collect_view();
                            view! {
                                <ul class="absolute bottom-full left-0 right-0 mx-4 mb-1 max-h-60 overflow-y-auto bg-white border border-gray-300 rounded-lg shadow dark:bg-gray-700 dark:border-gray-600 dark:text-white">
                                    {items}
                                </ul>
                            }
                        })
                }}
                <div class="flex items-center px-3 py-2 bg-gray-50 dark:bg-gray-700">
                    <input
                        id="chat"
                        autocomplete="off"
                        class="block mx-4 p-2.5 w-full text-sm text-gray-900 bg-white rounded-lg border border-gray-300 focus:ring-blue-500 focus:border-blue-500 dark:bg-gray-800 dark:border-gray-600 dark:placeholder-gray-400 dark:text-white dark:focus:ring-blue-500 dark:focus:border-blue-500 resize-none"
                        placeholder="Ask about your orders..."
                        on:input=update_message
                        on:focus=move |_| set_focused.set(true)
                        on:blur=move |_| set_focused.set(false)
                        prop:value=input
                        prop:disabled=pending
                    />
                    <button
                        type="submit"
                        class="inline-flex justify-center p-2 text-blue-600 rounded-full cursor-pointer hover:bg-blue-100 dark:text-blue-500 dark:hover:bg-gray-600 disabled:opacity-50"
                        prop:disabled=move || pending.get() || input.with(|t| t.trim().is_empty())
                    >
                        <svg
                            class="w-5 h-5 rotate-90 rtl:-rotate-90"
                            aria-hidden="true"
                            xmlns="http://www.w3.org/2000/svg"
                            fill="currentColor"
                            viewBox="0 0 18 20"
                        >
                            <path d="m17.914 18.594-8-18a1 1 0 0 0-1.828 0l-8 18a1 1 0 0 0 1.157 1.376L8 18.281V9a1 1 0 0 1 2 0v9.281l6.758 1.689a1 1 0 0 0 1.156-1.376Z" />
                        </svg>
                        <span class="sr-only">Send message</span>
                    </button>
                </div>
            </form>
        </div>
    }
}
