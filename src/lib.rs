//! # Portal Engine
//!
//! 教务系统集成引擎：RSA 加密登录、手动维护 Cookie 会话、抓取课表 / 成绩 / 考试 / 通知，
//! 并按学位课和模拟规则统计绩点。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 客户端和 Cookie），只暴露能力
//! - `SessionClient` - 每个账号唯一的会话，禁止自动重定向
//!
//! ### ② 接口层（Clients）
//! - `clients/` - 门户的每个接口一个方法，只负责组装请求和识别会话过期
//!
//! ### ③ 业务能力层（Services）
//! - `password_cipher` - RSA 加密密码
//! - `page_classifier` - 判断响应属于哪一种页面
//! - `html_extractor` - 多策略解析 HTML 片段
//! - `record_mapper` - 门户 JSON → 领域记录
//! - `gpa_engine` - 绩点统计
//!
//! ### ④ 流程层（Workflow）
//! - `AuthFlow` - 登录流程（CSRF → 公钥 → 提交 → 重定向）
//! - `AccountSession` - 单账号串行请求和单飞重新登录
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/sync_processor` - 多账号并发同步到本地缓存

pub mod clients;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use collaborators::{CredentialStore, MemoryCache, RecordCache, StaticCredentialStore};
pub use config::Config;
pub use error::{AppResult, ConfigError, PortalError};
pub use infrastructure::SessionClient;
pub use models::{Credentials, GpaStats, Term};
pub use orchestrator::{AccountSyncReport, SyncProcessor, SyncStats};
pub use services::GpaEngine;
pub use workflow::{AccountSession, AuthFlow, AuthResult};
