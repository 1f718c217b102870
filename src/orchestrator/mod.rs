//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责多账号的并发调度和统计，不做具体业务判断。
//!
//! ## 模块划分
//!
//! ### `sync_processor` - 多账号同步处理器
//! - 从凭据存储取出账号凭据
//! - 控制并发账号数量（Semaphore）
//! - 每个账号独占一个 `AccountSession`
//! - 把成绩、课表、考试和通知交给本地缓存
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! sync_processor (处理 Vec<账号>)
//!     ↓
//! workflow::AccountSession (单个账号，串行请求 + 单飞重新登录)
//!     ↓
//! workflow::AuthFlow / clients::PortalClient
//!     ↓
//! services (能力层：加密 / 页面分类 / 解析 / 绩点)
//!     ↓
//! infrastructure (基础设施：SessionClient)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：账号之间不共享任何可变状态
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计

pub mod sync_processor;

pub use sync_processor::{sync_account, AccountSyncReport, SyncProcessor, SyncStats};
