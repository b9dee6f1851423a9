use crate::config::ChatConfig;
use crate::interpreter::{columns, interpret, strip_tags, Link, LinkKind, Reply, Table};
use crate::state::{Message, Record};
use chrono::{DateTime, Local, Utc};
use leptos::IntoView;
use pulldown_cmark::Event;
use leptos::*;
use serde_json::Value;

/// Renders bot markdown. Raw HTML in the text is reduced to its text.
pub fn markdown_html(text: &str) -> String {
    let parser = pulldown_cmark::Parser::new(text).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(strip_tags(&html).into()),
        other => other,
    });
    let mut parsed = String::new();
    pulldown_cmark::html::push_html(&mut parsed, parser);
    parsed
}

pub fn escaped_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let _ = pulldown_cmark_escape::escape_html(&mut escaped, text);
    escaped
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn time_label(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp)
        .map(|t| format!("{}", DateTime::<Local>::from(t).format("%H:%M")))
        .unwrap_or_default()
}

fn table_view(records: Vec<Record>) -> View {
    let columns = columns(&records);
    let head = columns
        .iter()
        .map(|c| view! { <th class="px-3 py-2 text-left font-semibold">{c.clone()}</th> })
        .collect_view();
    let rows = records
        .into_iter()
        .map(|record| {
            let cells = columns
                .iter()
                .map(|c| view! { <td class="px-3 py-1">{cell_text(record.get(c))}</td> })
                .collect_view();
            view! { <tr class="border-t border-gray-200 dark:border-gray-600">{cells}</tr> }
        })
        .collect_view();
    view! {
        <div class="mt-2 overflow-x-auto">
            <table class="min-w-full text-xs text-gray-900 dark:text-white">
                <thead>
                    <tr>{head}</tr>
                </thead>
                <tbody>{rows}</tbody>
            </table>
        </div>
    }
    .into_view()
}

fn markdown_view(text: &str) -> Option<View> {
    (!text.is_empty()).then(|| view! { <div class="break-words" inner_html=markdown_html(text) /> }.into_view())
}

fn parsed_table_view(table: Table) -> View {
    let lead = markdown_view(&table.lead);
    let trail = markdown_view(&table.trail);
    view! { <div>{lead} {table_view(table.records)} {trail}</div> }.into_view()
}

fn link_view(link: Link) -> View {
    let context = (!link.context.is_empty()).then(|| {
        view! { <div class="mb-2" inner_html=markdown_html(&link.context) /> }
    });
    let action = match link.kind {
        LinkKind::Image => view! {
            <div class="flex flex-col items-center gap-2">
                <img class="max-w-full rounded-lg border" src=link.url.clone() alt=link.label.clone() />
                <a href=link.url.clone() download=true target="_blank" rel="noopener noreferrer">
                    <button
                        type="button"
                        class="px-4 py-2 text-sm text-white bg-green-600 rounded-lg hover:bg-green-700"
                    >
                        "📈 Download Graph"
                    </button>
                </a>
            </div>
        }
        .into_view(),
        LinkKind::Spreadsheet | LinkKind::File => {
            let forced = link.forced_download();
            view! {
                <a href=link.url.clone() download=forced target="_blank" rel="noopener noreferrer">
                    <button
                        type="button"
                        class="px-4 py-2 text-sm text-white bg-blue-700 rounded-lg hover:bg-blue-800"
                    >
                        {link.label.clone()}
                    </button>
                </a>
            }
            .into_view()
        }
    };
    view! { <div>{context} {action}</div> }.into_view()
}

fn body_view(message: &Message, config: &ChatConfig) -> View {
    if !message.is_bot() {
        return view! { <p class="whitespace-pre-wrap break-words" inner_html=escaped_html(&message.text) /> }
            .into_view();
    }
    if message.text.trim().is_empty() {
        return ().into_view();
    }
    match interpret(&message.text, config) {
        Reply::PlainText(text) => view! { <div class="break-words" inner_html=markdown_html(&text) /> }
            .into_view(),
        Reply::Table(table) => parsed_table_view(table),
        Reply::Link(link) => link_view(link),
    }
}

#[component]
pub fn MessageView(
    message: Message,
    index: usize,
    config: ChatConfig,
    show_download: bool,
    #[prop(into)] on_button: Callback<String>,
    #[prop(into)] on_download: Callback<usize>,
    #[prop(into)] on_export: Callback<Vec<Record>>,
) -> impl IntoView {
    let is_me = !message.is_bot();
    let datemsg = time_label(message.timestamp);
    let body = body_view(&message, &config);

    let backend_table = message.table_data().map(|records| {
        let excel_url = message.excel_url().map(str::to_owned);
        let export_rows = records.clone();
        view! {
            <div class="mt-2">
                <div class="flex gap-2">
                    <button
                        type="button"
                        class="px-3 py-1 text-sm text-white bg-green-600 rounded-lg hover:bg-green-700"
                        on:click=move |_| on_export.call(export_rows.clone())
                    >
                        "📥 Download as Excel"
                    </button>
                    {excel_url
                        .map(|url| {
                            view! {
                                <a
                                    href=url
                                    download=true
                                    target="_blank"
                                    rel="noopener noreferrer"
                                    class="px-3 py-1 text-sm text-white bg-blue-700 rounded-lg hover:bg-blue-800"
                                >
                                    "📄 Download Report"
                                </a>
                            }
                        })}
                </div>
                {table_view(records)}
            </div>
        }
    });

    let buttons = message.buttons.clone().unwrap_or_default();
    let buttons = (!buttons.is_empty()).then(|| {
        let buttons = buttons
            .into_iter()
            .map(|button| {
                let payload = button.payload.clone();
                view! {
                    <button
                        type="button"
                        class="mr-2 mb-1 px-3 py-1 text-sm border border-gray-300 rounded-lg hover:bg-gray-200 dark:hover:bg-gray-600"
                        on:click=move |_| on_button.call(payload.clone())
                    >
                        {button.label}
                    </button>
                }
            })
            .collect_view();
        view! { <div class="mt-2">{buttons}</div> }
    });

    let image = message.image.clone().map(|src| {
        view! {
            <div class="mt-2">
                <img class="max-w-full h-auto rounded" src=src alt="Bot response graph" />
            </div>
        }
    });

    let download = show_download.then(|| {
        view! {
            <button
                type="button"
                class="mt-3 px-4 py-2 text-sm text-white bg-green-600 rounded-lg hover:bg-green-700"
                on:click=move |_| on_download.call(index)
            >
                "📥 Download Orders"
            </button>
        }
    });

    view! {
        <div class="flex items-start m-5 gap-2.5" class:flex-row-reverse=move || is_me>
            <div class="w-8 h-8 rounded-full flex items-center justify-center text-xs font-semibold bg-blue-100 text-blue-700">
                {if is_me { "You" } else { "Bot" }}
            </div>
            <div class="flex flex-col gap-1 max-w-[80%]">
                <div
                    class="flex flex-col leading-1.5 p-4 rounded-e-xl rounded-es-xl text-sm"
                    class:bg-blue-600=move || is_me
                    class:text-white=move || is_me
                    class:bg-gray-100=move || !is_me
                    class:text-gray-900=move || !is_me
                >
                    {body}
                    {backend_table}
                    {buttons}
                    {image}
                    {download}
                </div>
                <span class="text-xs font-normal text-gray-500 dark:text-gray-400">{datemsg}</span>
            </div>
        </div>
    }
}
