//! Pure HTML email rendering.
//!
//! Three template families, chosen by caller intent: standard single
//! notification, daily digest, and critical alert. Rendering never touches
//! the transport or any facade; template plus data in, HTML out.

use chrono::{DateTime, Utc};

use sitepulse_entity::Notification;

/// A rendered email, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Stateless template renderer.
#[derive(Debug, Clone)]
pub struct EmailRenderer {
    site_url: String,
}

impl EmailRenderer {
    pub fn new(site_url: impl Into<String>) -> Self {
        let mut site_url = site_url.into();
        while site_url.ends_with('/') {
            site_url.pop();
        }
        Self { site_url }
    }

    /// The standard single-notification template.
    pub fn render_single(&self, notification: &Notification) -> RenderedEmail {
        let mut body = format!(
            "<h2 style=\"margin: 0 0 12px;\">{}</h2>\n<p>{}</p>",
            escape_html(&notification.content.title),
            escape_html(&notification.content.message),
        );
        if let Some(link) = self.action_link(notification) {
            body.push('\n');
            body.push_str(&link);
        }

        RenderedEmail {
            subject: notification.content.title.clone(),
            html: self.wrap(&notification.content.title, &body),
        }
    }

    /// The daily digest template, bounded to `max_items` entries with a
    /// "+K more" suffix when truncated. Callers must not invoke this with
    /// an empty item list; users without notifications get no digest.
    pub fn render_digest(
        &self,
        user_name: &str,
        items: &[Notification],
        max_items: usize,
    ) -> RenderedEmail {
        let shown = items.iter().take(max_items);
        let mut rows = String::new();
        for item in shown {
            rows.push_str(&format!(
                "<li style=\"margin-bottom: 8px;\"><strong>{}</strong><br>{}</li>\n",
                escape_html(&item.content.title),
                escape_html(&item.content.message),
            ));
        }

        let mut body = format!(
            "<h2 style=\"margin: 0 0 12px;\">Hello {}, here is your daily summary</h2>\n\
             <ul style=\"padding-left: 20px;\">\n{rows}</ul>",
            escape_html(user_name),
        );
        if items.len() > max_items {
            body.push_str(&format!(
                "\n<p style=\"color: #667;\">+{} more in your inbox</p>",
                items.len() - max_items
            ));
        }
        body.push_str(&format!(
            "\n<p><a href=\"{}/notifications\">Open your notifications</a></p>",
            self.site_url
        ));

        RenderedEmail {
            subject: format!("Your SitePulse daily digest ({} notifications)", items.len()),
            html: self.wrap("Daily digest", &body),
        }
    }

    /// The critical-alert template: visually distinct, always carries the
    /// project name and the event timestamp.
    pub fn render_critical(&self, notification: &Notification, project_name: &str) -> RenderedEmail {
        let mut body = format!(
            "<div style=\"border-left: 6px solid #c0392b; padding: 12px 16px; background: #fdf0ef;\">\n\
             <h2 style=\"margin: 0 0 8px; color: #c0392b;\">{}</h2>\n\
             <p>{}</p>\n\
             <p style=\"margin: 8px 0 0;\"><strong>Project:</strong> {}<br>\
             <strong>Reported:</strong> {}</p>\n\
             </div>",
            escape_html(&notification.content.title),
            escape_html(&notification.content.message),
            escape_html(project_name),
            format_timestamp(notification.created_at),
        );
        if let Some(link) = self.action_link(notification) {
            body.push('\n');
            body.push_str(&link);
        }

        RenderedEmail {
            subject: format!("[CRITICAL] {}", notification.content.title),
            html: self.wrap("Critical alert", &body),
        }
    }

    fn action_link(&self, notification: &Notification) -> Option<String> {
        let url = notification.content.action_url.as_deref()?;
        let href = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{url}", self.site_url)
        };
        let label = notification
            .content
            .action_text
            .as_deref()
            .unwrap_or("View details");
        Some(format!(
            "<p><a href=\"{}\" style=\"color: #1a6dcc;\">{}</a></p>",
            escape_html(&href),
            escape_html(label),
        ))
    }

    fn wrap(&self, title: &str, body: &str) -> String {
        format!(
            "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n\
             <body style=\"font-family: sans-serif; color: #222; max-width: 600px; margin: 0 auto;\">\n\
             {body}\n\
             <hr style=\"border: none; border-top: 1px solid #ddd; margin: 24px 0;\">\n\
             <p style=\"font-size: 12px; color: #889;\">Sent by <a href=\"{}\">SitePulse</a></p>\n\
             </body>\n</html>",
            escape_html(title),
            self.site_url,
        )
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_core::types::ProjectId;
    use sitepulse_entity::notification::taxonomy::{self, names};
    use sitepulse_entity::{BoundedContext, NotificationContent, NotificationPriority, UserRole};

    fn renderer() -> EmailRenderer {
        EmailRenderer::new("https://sitepulse.example/")
    }

    fn notification(title: &str, message: &str) -> Notification {
        let entry = taxonomy::resolve(names::LOW_STOCK, UserRole::Manager).unwrap();
        Notification::for_project(
            ProjectId::new(),
            entry,
            BoundedContext::Materials,
            NotificationPriority::Normal,
            NotificationContent::new(title, message).unwrap(),
        )
    }

    #[test]
    fn test_single_escapes_html() {
        let n = notification("Stock <low>", "Cement & rebar");
        let rendered = renderer().render_single(&n);
        assert!(rendered.html.contains("Stock &lt;low&gt;"));
        assert!(rendered.html.contains("Cement &amp; rebar"));
        assert!(!rendered.html.contains("<low>"));
    }

    #[test]
    fn test_single_resolves_relative_action_links() {
        let entry = taxonomy::resolve(names::LOW_STOCK, UserRole::Manager).unwrap();
        let content = NotificationContent::new("Stock low", "Cement below minimum")
            .unwrap()
            .with_action("/materials/42", "Review stock");
        let n = Notification::for_project(
            ProjectId::new(),
            entry,
            BoundedContext::Materials,
            NotificationPriority::Normal,
            content,
        );
        let rendered = renderer().render_single(&n);
        assert!(rendered
            .html
            .contains("href=\"https://sitepulse.example/materials/42\""));
        assert!(rendered.html.contains("Review stock"));
    }

    #[test]
    fn test_digest_truncates_with_more_suffix() {
        let items: Vec<Notification> = (0..12)
            .map(|i| notification(&format!("Item {i}"), "body"))
            .collect();
        let rendered = renderer().render_digest("Rosa", &items, 10);
        assert_eq!(rendered.subject, "Your SitePulse daily digest (12 notifications)");
        assert!(rendered.html.contains("Item 9"));
        assert!(!rendered.html.contains("Item 10"));
        assert!(rendered.html.contains("+2 more in your inbox"));
    }

    #[test]
    fn test_digest_without_overflow_has_no_suffix() {
        let items = vec![notification("Only one", "body")];
        let rendered = renderer().render_digest("Rosa", &items, 10);
        assert!(!rendered.html.contains("more in your inbox"));
    }

    #[test]
    fn test_critical_includes_project_and_timestamp() {
        let n = notification("Structural incident", "Crane failure on level 3");
        let rendered = renderer().render_critical(&n, "North Tower");
        assert!(rendered.subject.starts_with("[CRITICAL]"));
        assert!(rendered.html.contains("North Tower"));
        assert!(rendered
            .html
            .contains(&n.created_at.format("%Y-%m-%d %H:%M UTC").to_string()));
    }
}
