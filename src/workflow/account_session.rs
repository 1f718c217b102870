//! 账号会话
//!
//! 一个账号一个实例：独占自己的 `SessionClient`，所有门户请求在同一条请求通道里串行执行，
//! 会话过期时只触发一次重新登录，排队中的请求复用这次登录的结果。

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::auth_flow::{AuthFlow, AuthResult};
use crate::clients::PortalClient;
use crate::config::Config;
use crate::error::{AppResult, ConfigError, PortalError};
use crate::infrastructure::{RawPortalResponse, SessionClient};
use crate::models::{
    Credentials, DegreeCourseIndex, ExamEntry, GradeDetail, GradeRecord, Term, TimetableEntry,
};
use crate::services::{html_extractor, record_mapper};

/// 最近一次登录的结果
#[derive(Debug, Default)]
struct ReauthState {
    /// 每完成一次登录加一
    generation: u64,
    last: Option<AppResult<()>>,
}

/// 账号会话
///
/// 职责：
/// - 持有账号凭据和该账号唯一的 `SessionClient`
/// - 串行化该账号的所有门户请求
/// - 会话过期时单飞重新登录并重试一次
pub struct AccountSession {
    credentials: Credentials,
    session: SessionClient,
    client: PortalClient,
    follow_login_redirect: bool,
    /// 请求通道，持有期间独占该账号的 Cookie
    lane: Mutex<()>,
    reauth: Mutex<ReauthState>,
    generation: AtomicU64,
}

impl AccountSession {
    /// 创建账号会话，此时尚未登录
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self, ConfigError> {
        Ok(Self {
            credentials,
            session: SessionClient::new(config)?,
            client: PortalClient::new(config),
            follow_login_redirect: config.follow_login_redirect,
            lane: Mutex::new(()),
            reauth: Mutex::new(ReauthState::default()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn student_id(&self) -> &str {
        &self.credentials.username
    }

    /// 底层会话，仅用于诊断
    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    /// 已完成的登录次数
    pub fn login_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 登录
    pub async fn login(&self) -> AppResult<()> {
        let _lane = self.lane.lock().await;
        let mut state = self.reauth.lock().await;
        self.authenticate(&mut state).await
    }

    /// 退出登录，清空 Cookie
    pub async fn logout(&self) {
        let _lane = self.lane.lock().await;
        self.session.clear_session();
        self.reauth.lock().await.last = None;
        info!("👋 已退出登录: {}", self.student_id());
    }

    async fn authenticate(&self, state: &mut ReauthState) -> AppResult<()> {
        let mut flow = AuthFlow::new(&self.session, &self.client, self.follow_login_redirect);
        let result = flow
            .login(&self.credentials)
            .await
            .and_then(AuthResult::into_result);

        state.generation += 1;
        state.last = Some(result.clone());
        self.generation.store(state.generation, Ordering::SeqCst);
        result
    }

    /// 单飞重新登录
    ///
    /// `seen` 是调用方进入通道前看到的登录代数；如果期间已经有人重新登录过，直接复用那次的结果。
    async fn reauthenticate(&self, seen: u64) -> AppResult<()> {
        let mut state = self.reauth.lock().await;
        if state.generation != seen {
            if let Some(last) = &state.last {
                debug!("复用第 {} 次登录的结果", state.generation);
                return last.clone();
            }
        }
        info!("🔄 会话已过期，重新登录: {}", self.student_id());
        self.authenticate(&mut state).await
    }

    /// 在请求通道内执行一次门户操作，会话过期时重新登录并重试一次
    async fn with_session<T, F, Fut>(&self, operation: &str, op: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let seen = self.generation.load(Ordering::SeqCst);
        let _lane = self.lane.lock().await;

        match op().await {
            Err(PortalError::SessionExpired) => {
                warn!("⚠️ {} 查询时会话过期 ({})", operation, self.student_id());
                self.reauthenticate(seen).await?;
                op().await
            }
            other => other,
        }
    }

    // ========== 业务查询 ==========

    /// 查询课表
    pub async fn timetable(&self, term: Term) -> AppResult<Vec<TimetableEntry>> {
        let (session, client) = (&self.session, &self.client);
        let response = self
            .with_session("课表", move || client.query_timetable(session, term))
            .await?;
        let entries = record_mapper::timetable_from_json(&response.body, term)?;
        info!("✓ {} 课表 {} 条 ({})", term, entries.len(), self.student_id());
        Ok(entries)
    }

    /// 查询成绩
    ///
    /// # 参数
    /// - `term`: 学期
    /// - `with_details`: 是否逐门查询平时 / 实验 / 期末明细
    pub async fn grades(&self, term: Term, with_details: bool) -> AppResult<Vec<GradeRecord>> {
        let (session, client) = (&self.session, &self.client);
        let page_size = client.grade_page_size();
        let response = self
            .with_session("成绩", move || client.query_grades(session, term, 1, page_size))
            .await?;
        let records = record_mapper::grades_from_json(&response.body, term, self.student_id())?;
        info!("✓ {} 成绩 {} 条 ({})", term, records.len(), self.student_id());

        if !with_details {
            return Ok(records);
        }

        let mut detailed = Vec::with_capacity(records.len());
        for record in records {
            if record.class_id.is_empty() {
                detailed.push(record);
                continue;
            }
            match self.grade_detail(&record).await {
                Ok(detail) => detailed.push(record.with_detail(detail)),
                Err(e @ (PortalError::SessionExpired | PortalError::InvalidCredentials { .. })) => {
                    return Err(e)
                }
                Err(e) => {
                    warn!("⚠️ 成绩明细查询失败 ({}): {}", record.course_name, e);
                    detailed.push(record);
                }
            }
        }
        Ok(detailed)
    }

    /// 查询单门课程的成绩明细
    pub async fn grade_detail(&self, record: &GradeRecord) -> AppResult<GradeDetail> {
        let (session, client) = (&self.session, &self.client);
        let (term, course_name, class_id) = (
            record.term,
            record.course_name.as_str(),
            record.class_id.as_str(),
        );
        let response = self
            .with_session("成绩明细", move || {
                client.query_grade_detail(session, term, course_name, class_id)
            })
            .await?;

        let detail = html_extractor::parse_grade_detail(&response.body);
        if detail.is_empty() {
            debug!("成绩明细为空: {}", course_name);
        }
        Ok(detail)
    }

    /// 查询考试安排
    pub async fn exams(&self, term: Term) -> AppResult<Vec<ExamEntry>> {
        let (session, client) = (&self.session, &self.client);
        let response = self
            .with_session("考试", move || client.query_exams(session, term))
            .await?;
        let exams = record_mapper::exams_from_json(&response.body)?;
        info!("✓ {} 考试 {} 条 ({})", term, exams.len(), self.student_id());
        Ok(exams)
    }

    /// 查询调课通知
    pub async fn course_notices(&self) -> AppResult<Vec<String>> {
        let (session, client) = (&self.session, &self.client);
        let response = self
            .with_session("调课通知", move || client.query_course_notices(session))
            .await?;
        Ok(notices_from(&response, "调课通知"))
    }

    /// 查询停补课通知
    pub async fn reschedule_notices(&self) -> AppResult<Vec<String>> {
        let (session, client) = (&self.session, &self.client);
        let response = self
            .with_session("停补课通知", move || client.query_reschedule_notices(session))
            .await?;
        Ok(notices_from(&response, "停补课通知"))
    }

    /// 查询本学期开学日期
    pub async fn semester_start(&self) -> AppResult<Option<NaiveDate>> {
        let (session, client) = (&self.session, &self.client);
        let response = self
            .with_session("校历", move || client.query_calendar(session))
            .await?;
        let start = html_extractor::extract_semester_start(&response.body);
        if start.is_none() {
            debug!("校历中没有找到开学日期");
        }
        Ok(start)
    }

    /// 从培养方案构建学位课索引
    ///
    /// # 参数
    /// - `college_id`: 学院 id（`jg_id`）
    /// - `grade`: 年级（`njdm_id`）
    /// - `major_id`: 专业 id（`zyh_id`）
    pub async fn degree_courses(
        &self,
        college_id: &str,
        grade: &str,
        major_id: &str,
    ) -> AppResult<DegreeCourseIndex> {
        let (session, client) = (&self.session, &self.client);
        let response = self
            .with_session("培养方案", move || {
                client.query_plan_info(session, college_id, grade, major_id)
            })
            .await?;

        let Some(plan_id) = record_mapper::plan_id_from_json(&response.body)? else {
            warn!("⚠️ 没有找到培养方案: {} / {} / {}", college_id, grade, major_id);
            return Ok(DegreeCourseIndex::new());
        };

        let plan = plan_id.as_str();
        let response = self
            .with_session("培养方案课程", move || client.query_plan_courses(session, plan))
            .await?;
        let index = record_mapper::degree_index_from_json(&response.body)?;
        info!("✓ 培养方案 {} 共 {} 个课程键", plan_id, index.len());
        Ok(index)
    }
}

fn notices_from(response: &RawPortalResponse, label: &str) -> Vec<String> {
    let extraction = html_extractor::extract_notices(&response.body);
    match extraction.strategy {
        Some(strategy) => debug!("{} 使用策略 {:?}", label, strategy),
        None => info!("{} 暂无数据", label),
    }
    extraction.notices
}
