/// One parsed web search result, in source ranking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Format hits into the text block embedded as model context.
pub fn format_hits(hits: &[SearchHit]) -> String {
    let mut formatted = String::new();
    for hit in hits {
        formatted.push_str(&format!(
            "Title: {}\nDescription: {}\n\n",
            hit.title, hit.snippet
        ));
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_one_block_per_hit() {
        let hits = vec![
            SearchHit {
                title: "Rust".to_string(),
                snippet: "A systems language.".to_string(),
                url: "https://rust-lang.org".to_string(),
            },
            SearchHit {
                title: "Crates".to_string(),
                snippet: "Package registry.".to_string(),
                url: "https://crates.io".to_string(),
            },
        ];
        let formatted = format_hits(&hits);
        assert_eq!(
            formatted,
            "Title: Rust\nDescription: A systems language.\n\n\
             Title: Crates\nDescription: Package registry.\n\n"
        );
    }

    #[test]
    fn no_hits_formats_to_empty() {
        assert_eq!(format_hits(&[]), "");
    }
}
