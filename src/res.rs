use axum::{http::StatusCode, response::{Html, IntoResponse, Response}};
use pulldown_cmark::{html, CowStr, Event, Parser, Tag};
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};
use tower_sessions::Session;

use crate::{session::{ALERT, NOTICE}, store::users::User, AppResult};

#[macro_export]
macro_rules! include_res {
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Braces would otherwise be read as template slots by a later `replace`.
fn escape_braces(html: String) -> String {
    if !html.contains(['{', '}']) {
        return html;
    }
    html.replace('{', "&#123;").replace('}', "&#125;")
}

/// Escapes text for use inside HTML elements and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    html::push_html(&mut out, std::iter::once(Event::Text(CowStr::Borrowed(text))));
    escape_braces(out.replace('"', "&quot;"))
}

/// Relative references plus http, https and mailto. Anything else
/// (`javascript:`, `data:`, ...) is replaced by `#`.
fn safe_url(dest_url: CowStr<'_>) -> CowStr<'_> {
    // browsers ignore whitespace and control characters inside a scheme
    let compact: String = dest_url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    let scheme = compact
        .split_once(':')
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.contains(['/', '?', '#']));

    match scheme {
        None => dest_url,
        Some(scheme) if ["http", "https", "mailto"].iter().any(|ok| scheme.eq_ignore_ascii_case(ok)) => dest_url,
        Some(_) => CowStr::Borrowed("#"),
    }
}

/// Renders markdown, showing any embedded HTML as text instead of markup
/// and neutering links to anything but web pages and mail addresses.
pub fn markdown(text: &str) -> String {
    let parser = Parser::new(text).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        _ => event,
    });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    escape_braces(out)
}

pub fn datetime(value: PrimitiveDateTime) -> AppResult<String> {
    Ok(value.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))?)
}

/// Timestamps are stored in UTC and shown that way.
pub fn timestamp(value: OffsetDateTime) -> AppResult<String> {
    let utc = value.to_offset(time::UtcOffset::UTC);
    datetime(PrimitiveDateTime::new(utc.date(), utc.time()))
}

/// The value a `datetime-local` input expects.
pub fn datetime_local(value: PrimitiveDateTime) -> AppResult<String> {
    Ok(value.format(format_description!("[year]-[month]-[day]T[hour]:[minute]"))?)
}

pub fn errors_html(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|error| format!("<li>{}</li>", escape(error)))
        .collect();
    include_res!(str, "/pages/errors.html").replace("{items}", &items)
}

/// Wraps a page body in the site layout, consuming any pending flash.
pub async fn page(
    session: &Session,
    viewer: Option<&User>,
    title: &str,
    body: &str,
) -> AppResult<Html<String>> {
    let mut flash = String::new();
    if let Some(notice) = session.remove::<String>(NOTICE).await? {
        flash += &format!(r#"<p class="notice">{}</p>"#, escape(&notice));
    }
    if let Some(alert) = session.remove::<String>(ALERT).await? {
        flash += &format!(r#"<p class="alert">{}</p>"#, escape(&alert));
    }

    let nav = match viewer {
        Some(user) => include_res!(str, "/pages/nav_user.html").replace("{name}", &escape(&user.name)),
        None => include_res!(str, "/pages/nav_guest.html").to_owned(),
    };

    Ok(Html(
        include_res!(str, "/pages/layout.html")
            .replace("{title}", &escape(title))
            .replace("{nav}", &nav)
            .replace("{flash}", &flash)
            .replace("{body}", body),
    ))
}

pub fn sorry(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(include_res!(str, "/pages/sorry.html").replace("{what}", &escape(what))),
    )
        .into_response()
}

pub async fn not_found() -> Response {
    sorry("page")
}
