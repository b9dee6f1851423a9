use crate::state::{truncate_title, ConversationSummary};
use crate::suggestions::INTENTS;
use chrono::{DateTime, Local, Utc};
use ev::MouseEvent;
use leptos::*;

/// Sidebar date: "Today", "Yesterday", "N days ago", then a plain date.
pub fn relative_day(updated_at: i64, now: DateTime<Utc>) -> String {
    let Some(date) = DateTime::<Utc>::from_timestamp_millis(updated_at) else {
        return String::new();
    };
    match (now - date).num_days() {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days @ 2..=6 => format!("{days} days ago"),
        _ => DateTime::<Local>::from(date).format("%d/%m/%Y").to_string(),
    }
}

#[component]
pub fn Nav<T, U, V>(
    summaries: RwSignal<Vec<ConversationSummary>>,
    #[prop(into)] active: Signal<Option<String>>,
    show_intents: bool,
    on_select_conv: T,
    new_session: U,
    pick_intent: V,
) -> impl IntoView
where
    T: FnMut(String) -> () + 'static + Clone,
    U: FnMut() -> () + 'static + Clone,
    V: FnMut(String) -> () + 'static + Clone,
{
    let (show, set_show) = create_signal(true);
    let on_new = {
        let mut new_session = new_session.clone();
        move |_| new_session()
    };
    let intents = show_intents.then(|| {
        INTENTS
            .iter()
            .map(|intent| {
                let mut pick = pick_intent.clone();
                let text = intent.to_string();
                view! {
                    <li
                        class="px-3 py-1 text-left text-sm rounded-lg cursor-pointer hover:bg-gray-100 dark:hover:bg-gray-700"
                        on:click=move |_| {
                            set_show.set(false);
                            pick(text.clone());
                        }
                    >
                        {*intent}
                    </li>
                }
            })
            .collect::<Vec<_>>()
    });
    view! {
        {move || {
            if show.get() {
                view! { <div /> }
            } else {
                view! {
                    <div
                        class="lg:hidden text-gray-500 dark:text-gray-400 p-5 absolute top-0 left-0"
                        on:click=move |_| set_show.update(|s| *s = !*s)
                    >
                        <svg viewBox="0 0 10 8" width="20">
                            <path
                                d="M1 1h8M1 4h 8M1 7h8"
                                stroke="currentColor"
                                fill="currentColor"
                                stroke-width="2"
                                stroke-linecap="round"
                            />
                        </svg>
                    </div>
                }
            }
        }}
        <div
            class="lg:w-1/5 w-full lg:flex border-e-2 dark:border-gray-800 min-h-dvh max-h-dvh overflow-y-auto dark:text-white"
            class:hidden=move || !show.get()
        >
            <div class="text-center w-full flex flex-col vertical-align">
                <div
                    class="lg:hidden text-gray-500 dark:text-gray-400 p-5"
                    on:click=move |_| set_show.update(|s| *s = !*s)
                >
                    <svg viewBox="0 0 10 10" width="20">
                        <path
                            d="M1 1L9 9M1 9L9 1"
                            stroke="currentColor"
                            fill="currentColor"
                            stroke-width="2"
                            stroke-linecap="round"
                        />
                    </svg>
                </div>
                <div class="flex flex-row m-4">
                    <h5 class="text-base py-2.5 font-semibold text-gray-500 uppercase dark:text-gray-400 w-full">
                        Order Assistant
                    </h5>
                </div>
                <div>
                    <button
                        type="button"
                        class="text-white bg-gray-800 hover:bg-gray-900 focus:outline-none focus:ring-4 focus:ring-gray-300 font-medium rounded-lg text-sm px-5 py-2.5 me-2 mb-2 dark:bg-gray-800 dark:hover:bg-gray-700 dark:focus:ring-gray-700 dark:border-gray-700"
                        on:click=on_new
                    >
                        "+ New Session"
                    </button>
                </div>
                {intents
                    .map(|intents| {
                        view! {
                            <div class="px-2 py-2">
                                <h6 class="text-xs font-semibold text-gray-500 uppercase mb-1">
                                    Suggested
                                </h6>
                                <ul class="max-h-64 overflow-y-auto">{intents}</ul>
                            </div>
                        }
                    })}
                <div class="py-4 overflow-y-auto grow">
                    <h6 class="text-xs font-semibold text-gray-500 uppercase mb-1">Recent Sessions</h6>
                    <ul class="space-y-2 font-medium">
                        {move || {
                            let now = Utc::now();
                            let current = active.get();
                            summaries
                                .get()
                                .into_iter()
                                .map(|conv| {
                                    let title = truncate_title(&conv.title);
                                    let when = relative_day(conv.updated_at, now);
                                    let is_active = current.as_deref() == Some(conv.id.as_str());
                                    let mut value = on_select_conv.clone();
                                    let id = conv.id.clone();
                                    let onclick = move |ev: MouseEvent| {
                                        ev.prevent_default();
                                        // Only useful on mobile
                                        set_show.set(false);
                                        value(id.clone());
                                    };
                                    view! {
                                        <li on:click=onclick title=conv.title.clone()>
                                            <a
                                                href="#"
                                                class="flex flex-col p-2 text-gray-900 rounded-lg dark:text-white hover:bg-gray-100 dark:hover:bg-gray-700 group"
                                                class:bg-gray-100=move || is_active
                                            >
                                                <span class="ms-3 text-left">{title}</span>
                                                <span class="ms-3 text-left text-xs text-gray-500">
                                                    {when}
                                                </span>
                                            </a>
                                        </li>
                                    }
                                })
                                .collect::<Vec<_>>()
                        }}
                    </ul>
                </div>
            </div>
        </div>
    }
}
