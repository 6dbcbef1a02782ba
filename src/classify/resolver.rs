use crate::classify::Prediction;
use crate::models::LabelTable;
use crate::utils::error::ClassifierError;
use crate::Result;

/// 将原始得分向量解析为带标签的预测
#[derive(Debug, Clone)]
pub struct DecisionResolver {
    labels: LabelTable,
}

/// 解析结果：最终预测与完整的归一化分布
#[derive(Debug, Clone)]
pub struct Resolution {
    pub prediction: Prediction,
    pub distribution: Vec<f32>,
}

impl DecisionResolver {
    pub fn new(labels: LabelTable) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn resolve(&self, scores: &[f32]) -> Result<Resolution> {
        // 1. 长度校验，不猜测也不截断
        self.labels.ensure_matches(scores.len())?;

        if let Some((i, v)) = scores
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ClassifierError::Inference(format!(
                "Score at index {} is not a non-negative number: {}",
                i, v
            )));
        }

        // 2-3. 求和并归一化
        let distribution = normalize(scores).ok_or(ClassifierError::NoResult)?;

        // 4. 取最大值，并列时取最左
        let index = argmax_first(&distribution).ok_or(ClassifierError::NoResult)?;

        // 5. 越界检查
        let label = self
            .labels
            .get(index)
            .ok_or(ClassifierError::IndexOutOfRange {
                index,
                len: self.labels.len(),
            })?;

        let prediction = Prediction {
            label: label.to_string(),
            confidence: distribution[index],
            index,
        };

        Ok(Resolution {
            prediction,
            distribution,
        })
    }
}

impl Resolution {
    /// 置信度降序的前 k 个预测，并列时保持标签顺序
    pub fn top_k(&self, labels: &LabelTable, k: usize) -> Vec<Prediction> {
        let mut order: Vec<usize> = (0..self.distribution.len()).collect();
        order.sort_by(|&a, &b| self.distribution[b].total_cmp(&self.distribution[a]));

        order
            .into_iter()
            .take(k)
            .filter_map(|index| {
                labels.get(index).map(|label| Prediction {
                    label: label.to_string(),
                    confidence: self.distribution[index],
                    index,
                })
            })
            .collect()
    }
}

/// 总和为零或向量为空时返回 None
///
/// 在 f64 中累加，接近 `f32::MAX` 的得分求和也不会溢出
pub fn normalize(scores: &[f32]) -> Option<Vec<f32>> {
    let total: f64 = scores.iter().map(|&v| v as f64).sum();
    if scores.is_empty() || total == 0.0 || !total.is_finite() {
        return None;
    }
    Some(scores.iter().map(|&v| (v as f64 / total) as f32).collect())
}

/// 第一个达到最大值的下标
pub fn argmax_first(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, max)) if v <= max => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(names: &[&str]) -> DecisionResolver {
        DecisionResolver::new(LabelTable::new(
            "test",
            names.iter().map(|s| s.to_string()).collect(),
        ))
    }

    #[test]
    fn tie_goes_to_first_maximum() {
        let resolution = resolver(&["A", "B", "C", "D"])
            .resolve(&[0.2, 0.5, 0.5, 0.1])
            .unwrap();
        assert_eq!(resolution.prediction.label, "B");
        assert_eq!(resolution.prediction.index, 1);
    }

    #[test]
    fn normalizes_unscaled_scores() {
        let resolution = resolver(&["A", "B", "C"]).resolve(&[1.0, 3.0, 6.0]).unwrap();
        assert_eq!(resolution.prediction.label, "C");
        assert!((resolution.prediction.confidence - 0.6).abs() < 1e-6);

        let sum: f32 = resolution.distribution.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(resolution.distribution.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn all_zero_vector_has_no_result() {
        let err = resolver(&["A", "B", "C"]).resolve(&[0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, ClassifierError::NoResult));
    }

    #[test]
    fn empty_vector_against_empty_table_has_no_result() {
        let err = resolver(&[]).resolve(&[]).unwrap_err();
        assert!(matches!(err, ClassifierError::NoResult));
    }

    #[test]
    fn short_vector_is_a_label_mismatch() {
        let err = resolver(&["A", "B", "C", "D"]).resolve(&[0.1, 0.2, 0.7]).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::LabelMismatch { expected: 4, actual: 3 }
        ));
    }

    #[test]
    fn negative_or_nan_scores_are_rejected() {
        let r = resolver(&["A", "B"]);
        assert!(matches!(r.resolve(&[-1.0, 2.0]), Err(ClassifierError::Inference(_))));
        assert!(matches!(r.resolve(&[f32::NAN, 2.0]), Err(ClassifierError::Inference(_))));
    }

    #[test]
    fn normalization_sums_to_one_for_many_vectors() {
        let vectors: [&[f32]; 4] = [
            &[1e-8, 1e-8, 3e-8],
            &[1000.0, 0.0, 1.0],
            &[0.25, 0.25, 0.25],
            &[0.0, 0.0, 42.0],
        ];
        for v in vectors {
            let normalized = normalize(v).unwrap();
            let sum: f32 = normalized.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "{:?}", v);
            assert!(normalized.iter().all(|p| *p >= 0.0));
        }
    }

    #[test]
    fn scores_near_f32_max_still_normalize() {
        let normalized = normalize(&[f32::MAX, f32::MAX / 2.0]).unwrap();
        let sum: f32 = normalized.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((normalized[0] - 2.0 / 3.0).abs() < 1e-6);

        let resolution = resolver(&["A", "B"])
            .resolve(&[f32::MAX / 2.0, f32::MAX])
            .unwrap();
        assert_eq!(resolution.prediction.label, "B");
        assert!((resolution.prediction.confidence - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn top_k_orders_by_confidence_and_keeps_label_order_on_ties() {
        let r = resolver(&["A", "B", "C", "D"]);
        let resolution = r.resolve(&[0.2, 0.5, 0.5, 0.1]).unwrap();
        let top: Vec<_> = resolution
            .top_k(r.labels(), 3)
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(top, vec!["B", "C", "A"]);
    }

    #[test]
    fn argmax_of_empty_is_none() {
        assert_eq!(argmax_first(&[]), None);
        assert_eq!(argmax_first(&[3.0, 3.0]), Some(0));
    }
}
