//! 多账号同步处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **并发控制**：使用 Semaphore 限制同时同步的账号数量
//! 2. **逐账号同步**：每个账号独占一个 `AccountSession`，账号内部的请求串行执行
//! 3. **写入缓存**：按 (学号, 学期) 整体替换缓存中的记录
//! 4. **全局统计**：汇总所有账号的同步结果

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::collaborators::{CredentialStore, RecordCache};
use crate::config::Config;
use crate::models::{Credentials, Term, TimetableEntry};
use crate::utils::logging::{log_account_start, log_sync_summary};
use crate::workflow::AccountSession;

/// 单个账号的同步结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSyncReport {
    pub student_id: String,
    /// 成功写入缓存的学期数
    pub terms_synced: usize,
    pub grades: usize,
    pub timetable_entries: usize,
    pub exams: usize,
    pub notices: usize,
}

/// 全部账号的同步统计
#[derive(Debug, Default)]
pub struct SyncStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    pub reports: Vec<AccountSyncReport>,
}

/// 多账号同步处理器
pub struct SyncProcessor<C: RecordCache + 'static> {
    config: Config,
    cache: Arc<C>,
}

impl<C: RecordCache + 'static> SyncProcessor<C> {
    pub fn new(config: Config, cache: Arc<C>) -> Self {
        Self { config, cache }
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    /// 同步所有账号
    ///
    /// # 参数
    /// - `store`: 凭据存储
    /// - `accounts`: 要同步的账号列表
    ///
    /// # 返回
    /// 成功 / 失败统计，以及每个成功账号的同步报告
    pub async fn sync_all<S>(&self, store: &S, accounts: &[String]) -> Result<SyncStats>
    where
        S: CredentialStore + ?Sized,
    {
        let concurrency = self.config.max_concurrent_accounts.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let total = accounts.len();
        let mut stats = SyncStats {
            total,
            ..Default::default()
        };
        let mut handles = Vec::with_capacity(total);

        for (idx, account) in accounts.iter().enumerate() {
            let index = idx + 1;
            let Some(credentials) = store.credentials(account) else {
                warn!("[账号 {}] ⚠️ 凭据存储中没有账号 {}", index, account);
                stats.failed += 1;
                continue;
            };

            let permit = semaphore.clone().acquire_owned().await?;
            let config = self.config.clone();
            let cache = self.cache.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                log_account_start(index, total, &credentials.username);
                run_account(&config, credentials, cache.as_ref()).await
            });
            handles.push((index, account.clone(), handle));
        }

        let outcomes = join_all(
            handles
                .into_iter()
                .map(|(index, account, handle)| async move { (index, account, handle.await) }),
        )
        .await;

        for (index, account, outcome) in outcomes {
            match outcome {
                Ok(Ok(report)) => {
                    stats.success += 1;
                    stats.reports.push(report);
                }
                Ok(Err(e)) => {
                    error!("[账号 {}] ❌ {} 同步失败: {:#}", index, account, e);
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("[账号 {}] 任务执行失败: {}", index, e);
                    stats.failed += 1;
                }
            }
        }

        log_sync_summary(stats.success, stats.failed, stats.total);
        Ok(stats)
    }
}

/// 需要同步的学期：入学年份到明年，每年第一、第二学期
pub fn terms_to_sync(config: &Config, current: Term) -> Vec<Term> {
    let first_year = config.first_enrolment_year.unwrap_or(current.year - 4);
    Term::span(first_year, current.year + 1)
}

async fn run_account<C>(config: &Config, credentials: Credentials, cache: &C) -> Result<AccountSyncReport>
where
    C: RecordCache + ?Sized,
{
    let session = AccountSession::new(config, credentials).context("创建账号会话失败")?;
    sync_account(&session, config, cache).await
}

/// 同步单个账号
///
/// 登录失败直接返回错误；单个学期的成绩查询失败只记录警告，不影响其他学期。
pub async fn sync_account<C>(
    session: &AccountSession,
    config: &Config,
    cache: &C,
) -> Result<AccountSyncReport>
where
    C: RecordCache + ?Sized,
{
    let student_id = session.student_id().to_string();
    session
        .login()
        .await
        .with_context(|| format!("账号 {} 登录失败", student_id))?;

    let mut report = AccountSyncReport {
        student_id: student_id.clone(),
        ..Default::default()
    };

    let current = Term::current_local();
    let terms = terms_to_sync(config, current);
    info!("📅 {} 需要同步 {} 个学期", student_id, terms.len());

    for (i, term) in terms.iter().copied().enumerate() {
        if i > 0 && !config.sync_delay().is_zero() {
            tokio::time::sleep(config.sync_delay()).await;
        }
        match session.grades(term, true).await {
            Ok(records) => {
                report.grades += records.len();
                cache
                    .replace_grades(&student_id, term, records)
                    .with_context(|| format!("写入 {} 成绩缓存失败", term))?;
                report.terms_synced += 1;
            }
            Err(e) if e.is_transient() => {
                warn!("⚠️ {} {} 成绩同步失败: {}", student_id, term, e);
            }
            Err(e) => {
                return Err(anyhow!(e)).with_context(|| format!("{} 成绩同步失败", term));
            }
        }
    }

    let timetable: Vec<TimetableEntry> = session
        .timetable(current)
        .await
        .with_context(|| format!("{} 课表同步失败", current))?;
    report.timetable_entries = timetable.len();
    cache
        .replace_timetable(&student_id, current, timetable)
        .context("写入课表缓存失败")?;

    let exams = session
        .exams(current)
        .await
        .with_context(|| format!("{} 考试同步失败", current))?;
    report.exams = exams.len();
    cache
        .replace_exams(&student_id, current, exams)
        .context("写入考试缓存失败")?;

    let mut notices = session.course_notices().await.context("调课通知同步失败")?;
    notices.extend(
        session
            .reschedule_notices()
            .await
            .context("停补课通知同步失败")?,
    );
    report.notices = notices.len();
    cache
        .replace_notices(&student_id, notices)
        .context("写入通知缓存失败")?;

    info!(
        "✓ {} 同步完成: {} 个学期, 成绩 {} 条, 课表 {} 条, 考试 {} 条, 通知 {} 条",
        student_id,
        report.terms_synced,
        report.grades,
        report.timetable_entries,
        report.exams,
        report.notices
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Semester;

    #[test]
    fn test_terms_to_sync_defaults_to_four_years_back() {
        let config = Config::default();
        let terms = terms_to_sync(&config, Term::new(2025, Semester::First));
        assert_eq!(terms.first(), Some(&Term::new(2021, Semester::First)));
        assert_eq!(terms.last(), Some(&Term::new(2026, Semester::Second)));
        assert_eq!(terms.len(), 12);
    }

    #[test]
    fn test_terms_to_sync_honours_enrolment_year() {
        let config = Config {
            first_enrolment_year: Some(2024),
            ..Config::default()
        };
        let terms = terms_to_sync(&config, Term::new(2024, Semester::Second));
        assert_eq!(
            terms,
            vec![
                Term::new(2024, Semester::First),
                Term::new(2024, Semester::Second),
                Term::new(2025, Semester::First),
                Term::new(2025, Semester::Second),
            ]
        );
    }
}
