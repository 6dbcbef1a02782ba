use anyhow::Result;
use image::imageops::FilterType;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型文件目录
    pub models_dir: PathBuf,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,

    /// 分类流水线配置
    pub classifier_config: ClassifierConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,

    /// 最大并发连接数
    pub max_connections: usize,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// 模型输入宽度
    pub input_width: u32,

    /// 模型输入高度
    pub input_height: u32,

    /// 缩放使用的重采样滤波器
    pub resize_filter: FilterType,

    /// 历史记录上限，0 表示不限
    pub history_limit: usize,

    /// "更多信息"链接使用的搜索引擎主机
    pub search_engine: String,

    /// 自定义标签文件（覆盖内置标签表）
    pub labels_file: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_width: 224,
            input_height: 224,
            resize_filter: FilterType::Triangle,
            history_limit: 50,
            search_engine: "www.google.com".to_string(),
            labels_file: None,
        }
    }
}

impl Config {
    pub fn new(
        bind_addr: String,
        models_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 50 * 1024 * 1024, // 50MB
            max_connections: if dev_mode { 10 } else { 1000 },
        };

        Ok(Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            workers,
            dev_mode,
            onnx_config,
            server_config,
            classifier_config: ClassifierConfig::default(),
        })
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.classifier_config.history_limit = limit;
        self
    }

    pub fn with_labels_file(mut self, path: Option<PathBuf>) -> Self {
        self.classifier_config.labels_file = path;
        self
    }

    pub fn with_search_engine(mut self, host: String) -> Self {
        self.classifier_config.search_engine = host;
        self
    }

    pub fn with_resize_filter(mut self, filter: FilterType) -> Self {
        self.classifier_config.resize_filter = filter;
        self
    }

    /// 获取分类模型路径
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join("butterfly/classifier.onnx")
    }

    /// 获取标签文件路径：显式指定优先，其次是模型目录下的 labels.txt
    pub fn labels_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.classifier_config.labels_file {
            return Some(path.clone());
        }
        let default_path = self.models_dir.join("butterfly/labels.txt");
        default_path.exists().then_some(default_path)
    }
}

/// 按名称解析缩放滤波器
pub fn parse_resize_filter(name: &str) -> Result<FilterType> {
    let filter = match name.trim().to_ascii_lowercase().as_str() {
        "nearest" => FilterType::Nearest,
        "triangle" | "bilinear" => FilterType::Triangle,
        "catmullrom" | "bicubic" => FilterType::CatmullRom,
        "gaussian" => FilterType::Gaussian,
        "lanczos3" => FilterType::Lanczos3,
        other => anyhow::bail!(
            "Unknown resize filter '{}' (expected nearest, triangle, catmullrom, gaussian or lanczos3)",
            other
        ),
    };
    Ok(filter)
}
