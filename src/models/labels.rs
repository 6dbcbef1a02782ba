use crate::utils::error::ClassifierError;
use crate::Result;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

/// 内置标签表版本
pub const BUILTIN_LABELS_VERSION: &str = "butterflies-75-v1";

const BUILTIN_LABELS: [&str; 75] = [
    "SOUTHERN DOGFACE", "ADONIS", "BROWN SIPROETA", "MONARCH", "GREEN CELLED CATTLEHEART",
    "CAIRNS BIRDWING", "EASTERN DAPPLE WHITE", "RED POSTMAN", "MANGROVE SKIPPER", "BLACK HAIRSTREAK",
    "CABBAGE WHITE", "RED ADMIRAL", "PAINTED LADY", "PAPER KITE", "SOOTYWING",
    "PINE WHITE", "PEACOCK", "CHECQUERED SKIPPER", "JULIA", "COMMON WOOD-NYMPH",
    "BLUE MORPHO", "CLOUDED SULPHUR", "STRAITED QUEEN", "ORANGE OAKLEAF", "PURPLISH COPPER",
    "ATALA", "IPHICLUS SISTER", "DANAID EGGFLY", "LARGE MARBLE", "PIPEVINE SWALLOW",
    "BLUE SPOTTED CROW", "RED CRACKER", "QUESTION MARK", "CRIMSON PATCH", "BANDED PEACOCK",
    "SCARCE SWALLOW", "COPPER TAIL", "GREAT JAY", "INDRA SWALLOW", "VICEROY",
    "MALACHITE", "APPOLLO", "TWO BARRED FLASHER", "MOURNING CLOAK", "TROPICAL LEAFWING",
    "POPINJAY", "ORANGE TIP", "GOLD BANDED", "BECKERS WHITE", "RED SPOTTED PURPLE",
    "MILBERTS TORTOISESHELL", "SILVER SPOT SKIPPER", "AMERICAN SNOOT", "AN 88", "ULYSES",
    "COMMON BANDED AWL", "CRECENT", "METALMARK", "SLEEPY ORANGE", "PURPLE HAIRSTREAK",
    "ELBOWED PIERROT", "GREAT EGGFLY", "ORCHARD SWALLOW", "ZEBRA LONG WING", "WOOD SATYR",
    "MESTRA", "EASTERN PINE ELFIN", "EASTERN COMA", "YELLOW SWALLOW TAIL", "CLEOPATRA",
    "GREY HAIRSTREAK", "BANDED ORANGE HELICONIAN", "AFRICAN GIANT SWALLOWTAIL", "CHESTNUT", "CLODIUS PARNASSIAN",
];

static BUILTIN: Lazy<LabelTable> = Lazy::new(|| {
    LabelTable::new(
        BUILTIN_LABELS_VERSION,
        BUILTIN_LABELS.iter().map(|s| s.to_string()).collect(),
    )
});

/// 有序、不可变的类别名称表。概率向量下标 i 对应第 i 个标签。
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    version: Arc<str>,
    labels: Arc<[String]>,
}

impl LabelTable {
    pub fn new(version: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            version: Arc::from(version.into()),
            labels: Arc::from(labels),
        }
    }

    /// 内置的 75 类蝴蝶标签
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// 从文本文件加载，每行一个标签，空行忽略。版本取文件名。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::Config(format!("Failed to read labels {}: {}", path.display(), e))
        })?;

        let labels: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if labels.is_empty() {
            return Err(ClassifierError::Config(format!(
                "Label file {} contains no labels",
                path.display()
            )));
        }

        let version = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".to_string());

        tracing::info!("Loaded {} labels from {}", labels.len(), path.display());
        Ok(Self::new(version, labels))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// 模型输出宽度必须与标签数一致，否则视为配置错误
    pub fn ensure_matches(&self, output_len: usize) -> Result<()> {
        if output_len != self.len() {
            return Err(ClassifierError::LabelMismatch {
                expected: self.len(),
                actual: output_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_table_keeps_source_order() {
        let table = LabelTable::builtin();
        assert_eq!(table.len(), 75);
        assert_eq!(table.get(0), Some("SOUTHERN DOGFACE"));
        assert_eq!(table.get(3), Some("MONARCH"));
        assert_eq!(table.get(39), Some("VICEROY"));
        assert_eq!(table.get(74), Some("CLODIUS PARNASSIAN"));
        assert_eq!(table.get(75), None);
        assert_eq!(table.version(), BUILTIN_LABELS_VERSION);
    }

    #[test]
    fn loads_labels_from_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "MONARCH\n\n  VICEROY  \nADONIS").unwrap();

        let table = LabelTable::from_file(file.path()).unwrap();
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["MONARCH", "VICEROY", "ADONIS"]);
    }

    #[test]
    fn empty_label_file_is_a_config_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            LabelTable::from_file(file.path()),
            Err(ClassifierError::Config(_))
        ));
    }

    #[test]
    fn mismatch_fails_fast() {
        let table = LabelTable::builtin();
        assert!(table.ensure_matches(75).is_ok());
        assert!(matches!(
            table.ensure_matches(1000),
            Err(ClassifierError::LabelMismatch { expected: 75, actual: 1000 })
        ));
    }
}
