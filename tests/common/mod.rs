#![allow(dead_code)]

use butterfly_classifier::models::{InferenceAdapter, LabelTable};
use butterfly_classifier::{ClassifierError, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Cursor;

/// 按顺序返回预设得分的推理适配器；队列耗尽后重复最后一次
pub struct ScriptedAdapter {
    script: Mutex<VecDeque<Result<Vec<f32>>>>,
    last: Mutex<Vec<f32>>,
    seen_sizes: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedAdapter {
    pub fn new(initial: Vec<f32>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(initial),
            seen_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, scores: Vec<f32>) {
        self.script.lock().push_back(Ok(scores));
    }

    pub fn push_error(&self, message: &str) {
        self.script
            .lock()
            .push_back(Err(ClassifierError::Inference(message.to_string())));
    }

    pub fn seen_sizes(&self) -> Vec<(u32, u32)> {
        self.seen_sizes.lock().clone()
    }
}

impl InferenceAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn input_size(&self) -> (u32, u32) {
        (224, 224)
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<f32>> {
        self.seen_sizes.lock().push(image.dimensions());
        match self.script.lock().pop_front() {
            Some(Ok(scores)) => {
                *self.last.lock() = scores.clone();
                Ok(scores)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.lock().clone()),
        }
    }
}

pub fn labels(names: &[&str]) -> LabelTable {
    LabelTable::new("test", names.iter().map(|s| s.to_string()).collect())
}

pub fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 77])
    }))
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    photo(width, height)
        .write_to(&mut out, ImageFormat::Jpeg)
        .expect("encode jpeg");
    out.into_inner()
}

/// 一个位置得分最高、其余为零的向量
pub fn one_hot(len: usize, index: usize) -> Vec<f32> {
    let mut scores = vec![0.0; len];
    scores[index] = 1.0;
    scores
}
