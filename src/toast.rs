use crate::session::{Level, Notice};
use leptos::*;
use std::time::Duration;

const TOAST_TTL: Duration = Duration::from_secs(4);

/// Shows `notice` and drops the oldest toast once it expires.
pub fn push_notice(toasts: RwSignal<Vec<Notice>>, notice: Notice) {
    toasts.update(|t| t.push(notice));
    set_timeout(
        move || {
            toasts.update(|t| {
                if !t.is_empty() {
                    t.remove(0);
                }
            })
        },
        TOAST_TTL,
    );
}

#[component]
pub fn Toasts(toasts: RwSignal<Vec<Notice>>) -> impl IntoView {
    view! {
        <div class="fixed bottom-4 right-4 z-50 flex flex-col gap-2">
            {move || {
                toasts
                    .get()
                    .into_iter()
                    .map(|notice| {
                        let error = notice.level == Level::Error;
                        view! {
                            <div
                                class="px-4 py-2 rounded-lg shadow text-sm text-white"
                                class:bg-green-600=move || !error
                                class:bg-red-600=move || error
                            >
                                {notice.text}
                            </div>
                        }
                    })
                    .collect::<Vec<_>>()
            }}
        </div>
    }
}
