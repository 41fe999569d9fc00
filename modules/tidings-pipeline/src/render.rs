//! The three render targets. All derive from one `Draft` so the formats
//! can never drift apart in content.

use tidings_common::{Draft, RenderedFormats};

pub fn render(draft: &Draft, community_name: &str, community_url: &str) -> RenderedFormats {
    RenderedFormats {
        html: render_html(draft, community_name, community_url),
        markdown: render_markdown(draft, community_name, community_url),
        text: render_text(draft, community_name, community_url),
    }
}

fn footer_line(draft: &Draft) -> String {
    format!(
        "{} words \u{00b7} ~{} min read",
        draft.total_word_count, draft.estimated_read_time_min
    )
}

fn render_html(draft: &Draft, community_name: &str, community_url: &str) -> String {
    let mut sections_html = String::new();
    for section in &draft.sections {
        let paragraphs: String = section
            .body
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .map(|p| format!("        <p>{}</p>\n", html_escape(p.trim())))
            .collect();
        sections_html.push_str(&format!(
            "    <div class=\"section\">\n        <h2>{}</h2>\n{}    </div>\n",
            html_escape(&section.title),
            paragraphs
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>\n\
         body {{ font-family: Georgia, serif; max-width: 680px; margin: 0 auto; padding: 24px; color: #1a1a1a; }}\n\
         h1 {{ text-align: center; }}\n\
         .subtitle {{ text-align: center; color: #555; }}\n\
         .section {{ margin: 32px 0; }}\n\
         .footer {{ text-align: center; color: #777; border-top: 1px solid #ddd; padding-top: 16px; }}\n\
         </style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n<p class=\"subtitle\">{subtitle}</p>\n\
         {sections}\
         <div class=\"footer\">\n\
         <p><a href=\"{url}\">{community}</a></p>\n\
         <p>{footer}</p>\n\
         <p>Generated {generated}</p>\n\
         </div>\n</body>\n</html>\n",
        title = html_escape(&draft.title),
        subtitle = html_escape(&draft.subtitle),
        sections = sections_html,
        url = community_url,
        community = html_escape(community_name),
        footer = footer_line(draft),
        generated = draft.generated_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

fn render_markdown(draft: &Draft, community_name: &str, community_url: &str) -> String {
    let mut out = format!("# {}\n\n*{}*\n\n", draft.title, draft.subtitle);
    for section in &draft.sections {
        out.push_str(&format!("## {}\n\n{}\n\n", section.title, section.body));
    }
    out.push_str("---\n\n");
    out.push_str(&format!(
        "[{}]({}) \u{00b7} {}\n",
        community_name,
        community_url,
        footer_line(draft)
    ));
    out
}

fn render_text(draft: &Draft, community_name: &str, community_url: &str) -> String {
    let mut out = format!("{}\n{}\n\n", draft.title.to_uppercase(), draft.subtitle);
    for section in &draft.sections {
        out.push_str(&format!(
            "{}\n{}\n{}\n\n",
            section.title,
            "-".repeat(section.title.len()),
            strip_markup(&section.body)
        ));
    }
    out.push_str(&format!(
        "{} ({})\n{}\n",
        community_name,
        community_url,
        footer_line(draft)
    ));
    out
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn strip_markup(text: &str) -> String {
    text.replace("**", "").replace('*', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tidings_common::{Section, SectionKind};

    fn draft() -> Draft {
        let sections = vec![
            Section::new(SectionKind::Trending, "Trending", "one two three"),
            Section::new(SectionKind::Category, "Dev & Tools", "four five"),
        ];
        let total: usize = sections.iter().map(|s| s.word_count).sum();
        Draft {
            title: "Test Digest".to_string(),
            subtitle: "A test".to_string(),
            sections,
            total_word_count: total,
            estimated_read_time_min: 1,
            featured_discussion_ids: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn all_formats_report_the_same_word_count() {
        let formats = render(&draft(), "Austin", "https://example.org");
        let footer = "5 words";
        assert!(formats.html.contains(footer));
        assert!(formats.markdown.contains(footer));
        assert!(formats.text.contains(footer));
    }

    #[test]
    fn html_escapes_angle_brackets() {
        let mut d = draft();
        d.sections[0].body = "use Vec<String> here".to_string();
        let formats = render(&d, "Austin", "https://example.org");
        assert!(formats.html.contains("Vec&lt;String&gt;"));
    }
}
