/// 为识别出的蝴蝶构造网页搜索链接
#[derive(Debug, Clone)]
pub struct SearchLinker {
    engine: String,
}

impl SearchLinker {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
        }
    }

    pub fn more_info_url(&self, label: &str) -> String {
        let query = format!("{} butterfly", label);
        format!(
            "https://{}/search?q={}",
            self.engine,
            urlencoding::encode(&query)
        )
    }
}

impl Default for SearchLinker {
    fn default() -> Self {
        Self::new("www.google.com")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_label_and_suffix() {
        let linker = SearchLinker::default();
        assert_eq!(
            linker.more_info_url("RED ADMIRAL"),
            "https://www.google.com/search?q=RED%20ADMIRAL%20butterfly"
        );
    }

    #[test]
    fn keeps_unreserved_characters() {
        let linker = SearchLinker::new("duckduckgo.com");
        assert_eq!(
            linker.more_info_url("COMMON WOOD-NYMPH"),
            "https://duckduckgo.com/search?q=COMMON%20WOOD-NYMPH%20butterfly"
        );
    }
}
