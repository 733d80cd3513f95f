//! HTML pages
//!
//! Each page is a function from typed values to a full document. Every
//! interpolated value goes through [`escape`].

use crate::forms::FieldErrors;
use axum::http::StatusCode;
use synthese_common::db::models::{Article, Keyword, Reference, User};

/// Values shared by every page: who is logged in and the pending messages
pub struct Context<'a> {
    pub user: Option<&'a User>,
    pub messages: &'a [String],
}

impl<'a> Context<'a> {
    pub fn new(user: Option<&'a User>, messages: &'a [String]) -> Self {
        Self { user, messages }
    }
}

/// Escape text for element content and quoted attribute values
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(ctx: &Context<'_>, title: &str, body: &str) -> String {
    let nav = match ctx.user {
        Some(user) => format!(
            "<a href=\"/index\">Home</a> \
             <a href=\"/user_articles_list\">My articles</a> \
             <a href=\"/create_article\">New article</a> \
             <a href=\"/user/{}\">Profile</a> \
             <a href=\"/logout\">Logout</a>",
            escape(&user.username)
        ),
        None => "<a href=\"/login\">Login</a>".to_string(),
    };

    let messages = if ctx.messages.is_empty() {
        String::new()
    } else {
        let items: String = ctx
            .messages
            .iter()
            .map(|message| format!("<li>{}</li>", escape(message)))
            .collect();
        format!("<ul class=\"flashes\">{}</ul>", items)
    };

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"utf-8\"><title>{title} - Synthese</title></head>\n\
         <body>\n\
         <nav>{nav}</nav>\n\
         {messages}\n\
         <main>\n{body}\n</main>\n\
         </body>\n\
         </html>\n",
        title = escape(title),
        nav = nav,
        messages = messages,
        body = body,
    )
}

fn errors_for(errors: &FieldErrors, field: &str) -> String {
    errors
        .get(field)
        .map(|messages| {
            messages
                .iter()
                .map(|message| format!("<span class=\"error\">{}</span>", escape(message)))
                .collect()
        })
        .unwrap_or_default()
}

fn input(kind: &str, name: &str, label: &str, value: &str, errors: &FieldErrors) -> String {
    format!(
        "<p><label for=\"{name}\">{label}</label><br>\
         <input type=\"{kind}\" id=\"{name}\" name=\"{name}\" value=\"{value}\">{errors}</p>",
        kind = kind,
        name = name,
        label = escape(label),
        value = escape(value),
        errors = errors_for(errors, name),
    )
}

pub fn index(ctx: &Context<'_>, user: &User) -> String {
    let body = format!(
        "<h1>Hi, {}!</h1>\n\
         <p><a href=\"/user_articles_list\">Browse your articles</a> or \
         <a href=\"/create_article\">write a new one</a>.</p>",
        escape(&user.username)
    );
    layout(ctx, "Index", &body)
}

pub fn login(ctx: &Context<'_>, username: &str, next: Option<&str>, errors: &FieldErrors) -> String {
    let action = match next {
        Some(next) => format!(
            "/login?next={}",
            crate::middleware::session::encode_component(next)
        ),
        None => "/login".to_string(),
    };
    let body = format!(
        "<h1>Sign in</h1>\n\
         <form action=\"{action}\" method=\"post\" novalidate>\n\
         {username}\n{password}\n\
         <p><input type=\"checkbox\" id=\"remember_me\" name=\"remember_me\" value=\"y\"> \
         <label for=\"remember_me\">Remember me</label></p>\n\
         <p><input type=\"submit\" value=\"Sign in\"></p>\n\
         </form>\n\
         <p>Forgot your password? <a href=\"/reset_password_request\">Reset it</a></p>",
        action = escape(&action),
        username = input("text", "username", "Username", username, errors),
        password = input("password", "password", "Password", "", errors),
    );
    layout(ctx, "Sign in", &body)
}

pub fn user_profile(ctx: &Context<'_>, user: &User) -> String {
    let body = format!(
        "<h1>{username}</h1>\n\
         <p>Email: {email}</p>\n\
         <p><a href=\"/user_profile_edition\">Edit your profile</a></p>",
        username = escape(&user.username),
        email = escape(&user.email),
    );
    layout(ctx, &user.username, &body)
}

pub fn access_denied(ctx: &Context<'_>) -> String {
    layout(
        ctx,
        "Access denied",
        "<h1>Access denied</h1>\n<p>You are not allowed to see this page.</p>",
    )
}

pub fn profile_editor(ctx: &Context<'_>, username: &str, email: &str, errors: &FieldErrors) -> String {
    let body = format!(
        "<h1>Edit your profile</h1>\n\
         <form action=\"/user_profile_edition\" method=\"post\" novalidate>\n\
         {username}\n{email}\n\
         <p><input type=\"submit\" value=\"Save\"></p>\n\
         </form>",
        username = input("text", "username", "Username", username, errors),
        email = input("email", "email", "Email", email, errors),
    );
    layout(ctx, "Edit your profile", &body)
}

/// Form for a new article, or for `article_id` when given
pub fn article_editor(
    ctx: &Context<'_>,
    article_id: Option<i32>,
    title: &str,
    synthesis: &str,
    errors: &FieldErrors,
) -> String {
    let (heading, action) = match article_id {
        Some(id) => ("Modify an article".to_string(), format!("/modify_article/{}", id)),
        None => ("Create an article".to_string(), "/create_article".to_string()),
    };
    let body = format!(
        "<h1>{heading}</h1>\n\
         <form action=\"{action}\" method=\"post\" novalidate>\n\
         {title}\n\
         <p><label for=\"synthesis\">Synthesis</label><br>\
         <textarea id=\"synthesis\" name=\"synthesis\" rows=\"12\" cols=\"80\">{synthesis}</textarea>{synthesis_errors}</p>\n\
         <p><input type=\"submit\" value=\"Save\"></p>\n\
         </form>",
        heading = heading,
        action = action,
        title = input("text", "title", "Title", title, errors),
        synthesis = escape(synthesis),
        synthesis_errors = errors_for(errors, "synthesis"),
    );
    layout(ctx, &heading, &body)
}

pub fn articles_list(ctx: &Context<'_>, articles: &[Article]) -> String {
    let items = if articles.is_empty() {
        "<p>No article yet.</p>".to_string()
    } else {
        let rows: String = articles
            .iter()
            .map(|article| {
                format!(
                    "<li class=\"article\"><a href=\"/article/{id}\">{title}</a> \
                     <small>{updated}</small></li>\n",
                    id = article.id,
                    title = escape(&article.title),
                    updated = article.update_date.format("%d/%m/%Y"),
                )
            })
            .collect();
        format!("<ul class=\"articles\">\n{}</ul>", rows)
    };
    let body = format!("<h1>My articles</h1>\n{}", items);
    layout(ctx, "My articles", &body)
}

pub fn article(
    ctx: &Context<'_>,
    article: &Article,
    keywords: &[Keyword],
    references: &[Reference],
) -> String {
    let keywords: String = keywords
        .iter()
        .map(|keyword| format!("<li>{}</li>", escape(&keyword.description)))
        .collect();
    let references: String = references
        .iter()
        .map(|reference| format!("<li>{}</li>", escape(&reference.description)))
        .collect();

    let body = format!(
        "<article>\n\
         <h1>{title}</h1>\n\
         <p class=\"dates\">Created <time datetime=\"{created}\" title=\"{created}\">{created_day}</time>, \
         updated <time datetime=\"{updated}\" title=\"{updated}\">{updated_day}</time></p>\n\
         <div class=\"synthesis\">{synthesis}</div>\n\
         <h2>Keywords</h2>\n<ul class=\"keywords\">{keywords}</ul>\n\
         <form id=\"keyword-form\" action=\"/add_keyword/{owner}\" method=\"post\">\n\
         <input type=\"hidden\" name=\"article_id\" value=\"{id}\">\n\
         <input type=\"text\" name=\"keywords\" maxlength=\"40\">\n\
         <input type=\"submit\" value=\"Add keyword\">\n\
         </form>\n\
         <h2>References</h2>\n<ul class=\"references\">{references}</ul>\n\
         <p><a href=\"/modify_article/{id}\">Modify</a> \
         <a href=\"/delete_article/{id}\">Delete</a></p>\n\
         </article>\n\
         <script>\n\
         document.getElementById('keyword-form').addEventListener('submit', async (event) => {{\n\
           event.preventDefault();\n\
           const form = event.target;\n\
           const response = await fetch(form.action, {{\n\
             method: 'POST',\n\
             headers: {{'Accept': 'application/json'}},\n\
             body: new URLSearchParams(new FormData(form)),\n\
           }});\n\
           const result = await response.json();\n\
           if (result.already_exists) {{ alert('This keyword already exists.'); }}\n\
           else {{ window.location.reload(); }}\n\
         }});\n\
         </script>",
        title = escape(&article.title),
        created = article.creation_date.format("%d/%m/%Y %H:%M:%S"),
        created_day = article.creation_date.format("%d/%m/%Y"),
        updated = article.update_date.format("%d/%m/%Y %H:%M:%S"),
        updated_day = article.update_date.format("%d/%m/%Y"),
        synthesis = escape(&article.synthesis),
        keywords = keywords,
        references = references,
        owner = article.user_id,
        id = article.id,
    );
    layout(ctx, &article.title, &body)
}

pub fn reset_request(ctx: &Context<'_>, email: &str, errors: &FieldErrors) -> String {
    let body = format!(
        "<h1>Reset your password</h1>\n\
         <form action=\"/reset_password_request\" method=\"post\" novalidate>\n\
         {email}\n\
         <p><input type=\"submit\" value=\"Send instructions\"></p>\n\
         </form>",
        email = input("email", "email", "Email", email, errors),
    );
    layout(ctx, "Reset your password", &body)
}

pub fn reset_password(ctx: &Context<'_>, token: &str, errors: &FieldErrors) -> String {
    let body = format!(
        "<h1>Choose a new password</h1>\n\
         <form action=\"/reset_password/{token}\" method=\"post\" novalidate>\n\
         {password}\n{password2}\n\
         <p><input type=\"submit\" value=\"Reset password\"></p>\n\
         </form>",
        token = escape(token),
        password = input("password", "password", "Password", "", errors),
        password2 = input("password", "password2", "Repeat password", "", errors),
    );
    layout(ctx, "Reset your password", &body)
}

/// Standalone page for 404 and 500 responses
pub fn error_page(status: StatusCode) -> String {
    let (title, text) = if status == StatusCode::NOT_FOUND {
        ("File not found", "The page you are looking for does not exist.")
    } else {
        (
            "An unexpected error has occurred",
            "The administrator has been notified. Sorry for the inconvenience!",
        )
    };
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/index\">Back</a></p>",
        title, text
    );
    layout(&Context::new(None, &[]), title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: None,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_layout_shows_messages_and_nav() {
        let user = alice();
        let messages = vec!["Saved <b>".to_string()];
        let html = index(&Context::new(Some(&user), &messages), &user);
        assert!(html.contains("<li>Saved &lt;b&gt;</li>"));
        assert!(html.contains("/logout"));

        let html = login(&Context::new(None, &[]), "", Some("/article/1"), &FieldErrors::new());
        assert!(html.contains("action=\"/login?next=/article/1\""));
        assert!(!html.contains("/logout"));
    }

    #[test]
    fn test_article_dates() {
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let article = Article {
            id: 3,
            title: "Foo".to_string(),
            synthesis: "<i>bar</i>".to_string(),
            creation_date: date,
            update_date: date,
            user_id: 1,
        };
        let user = alice();
        let html = super::article(&Context::new(Some(&user), &[]), &article, &[], &[]);
        assert!(html.contains("09/03/2024 14:05:07"));
        assert!(html.contains(">09/03/2024</time>"));
        assert!(html.contains("&lt;i&gt;bar&lt;/i&gt;"));
        assert!(html.contains("action=\"/add_keyword/1\""));
    }

    #[test]
    fn test_inline_errors() {
        let errors = crate::forms::field_error("title", "Taken");
        let html = article_editor(&Context::new(None, &[]), Some(4), "Foo", "", &errors);
        assert!(html.contains("<span class=\"error\">Taken</span>"));
        assert!(html.contains("action=\"/modify_article/4\""));
    }

    #[test]
    fn test_error_pages() {
        assert!(error_page(StatusCode::NOT_FOUND).contains("File not found"));
        assert!(error_page(StatusCode::INTERNAL_SERVER_ERROR).contains("unexpected error"));
    }
}
