/// 教务系统查询客户端
///
/// 封装所有门户接口的地址、参数和会话过期判断
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppResult, PortalError};
use crate::infrastructure::{PortalRequest, RawPortalResponse, SessionClient};
use crate::models::{RsaKey, Term};
use crate::services::page_classifier::{self, PortalPage};
use crate::utils::{epoch_millis, truncate_text};

/// 门户接口路径
pub struct PortalEndpoints;

impl PortalEndpoints {
    pub const LOGIN_PAGE: &'static str = "/xtgl/login_slogin.html";
    pub const PUBLIC_KEY: &'static str = "/xtgl/login_getPublicKey.html";
    pub const TIMETABLE: &'static str = "/kbcx/xskbcx_cxXsKb.html";
    pub const GRADES: &'static str = "/cjcx/cjcx_cxDgXscj.html";
    pub const GRADE_DETAIL: &'static str = "/cjcx/cjcx_cxCjxqGjh.html";
    pub const EXAMS: &'static str = "/kwgl/kscx_cxXsksxxIndex.html";
    pub const CALENDAR: &'static str = "/xtgl/index_cxAreaSix.html";
    pub const COURSE_NOTICES: &'static str = "/xtgl/index_cxAreaOne.html";
    pub const RESCHEDULE_NOTICES: &'static str = "/xtgl/index_cxAreaThree.html";
    pub const PLAN_INFO: &'static str = "/jxzxjhgl/jxzxjhck_cxJxzxjhckIndex.html";
    pub const PLAN_COURSES: &'static str = "/jxzxjhgl/jxzxjhkcxx_cxJxzxjhkcxxIndex.html";
}

/// 培养方案课程一次取完
const PLAN_COURSE_PAGE_SIZE: u32 = 1000;

/// 教务系统查询客户端
///
/// 不持有会话，每个方法都借用调用方的 `SessionClient`。
#[derive(Debug, Clone)]
pub struct PortalClient {
    grade_page_size: u32,
    exam_page_size: u32,
}

impl PortalClient {
    /// 创建新的查询客户端
    pub fn new(config: &Config) -> Self {
        Self {
            grade_page_size: config.grade_page_size,
            exam_page_size: config.exam_page_size,
        }
    }

    pub fn grade_page_size(&self) -> u32 {
        self.grade_page_size
    }

    // ========== 登录相关 ==========

    /// 获取登录页（含 CSRF 令牌）
    pub async fn fetch_login_page(&self, session: &SessionClient) -> AppResult<RawPortalResponse> {
        let response = session.send(PortalRequest::get(PortalEndpoints::LOGIN_PAGE)).await?;
        expect_success(response, PortalEndpoints::LOGIN_PAGE)
    }

    /// 获取本次登录用的 RSA 公钥
    pub async fn fetch_public_key(&self, session: &SessionClient) -> AppResult<RsaKey> {
        let request = PortalRequest::get(PortalEndpoints::PUBLIC_KEY).query("time", epoch_millis());
        let response = expect_success(session.send(request).await?, PortalEndpoints::PUBLIC_KEY)?;
        serde_json::from_str(&response.body).map_err(|e| {
            debug!("公钥响应: {}", truncate_text(&response.body, 200));
            PortalError::decode(PortalEndpoints::PUBLIC_KEY, e)
        })
    }

    /// 提交登录表单，响应原样返回给登录流程判断
    ///
    /// # 参数
    /// - `username`: 学号
    /// - `encrypted_password`: Base64 密文
    /// - `csrf_token`: 登录页上的令牌
    pub async fn submit_login(
        &self,
        session: &SessionClient,
        username: &str,
        encrypted_password: &str,
        csrf_token: &str,
    ) -> AppResult<RawPortalResponse> {
        let referer = session.resolve(PortalEndpoints::LOGIN_PAGE)?;
        let request = PortalRequest::post(PortalEndpoints::LOGIN_PAGE)
            .query("time", epoch_millis())
            .header("Referer", referer.as_str())
            .form_field("csrftoken", csrf_token)
            .form_field("yhm", username)
            .form_field("mm", encrypted_password);
        session.send(request).await
    }

    /// 手动跟随一次重定向
    pub async fn follow(&self, session: &SessionClient, location: &str) -> AppResult<RawPortalResponse> {
        session.send(PortalRequest::get(location)).await
    }

    // ========== 业务查询 ==========

    /// 查询课表
    pub async fn query_timetable(&self, session: &SessionClient, term: Term) -> AppResult<RawPortalResponse> {
        let request = PortalRequest::post(PortalEndpoints::TIMETABLE)
            .query("gnmkdm", "N2151")
            .form_field("xnm", term.year_code())
            .form_field("xqm", term.semester_code())
            .form_field("kzlx", "ck")
            .xhr();
        self.send_authenticated(session, request, PortalEndpoints::TIMETABLE).await
    }

    /// 查询成绩
    ///
    /// # 参数
    /// - `term`: 学期
    /// - `page`: 页码，从 1 开始
    /// - `page_size`: 每页条数，设大以避免分页
    pub async fn query_grades(
        &self,
        session: &SessionClient,
        term: Term,
        page: u32,
        page_size: u32,
    ) -> AppResult<RawPortalResponse> {
        let request = PortalRequest::post(PortalEndpoints::GRADES)
            .query("doType", "query")
            .query("gnmkdm", "N305005")
            .form_field("xnm", term.year_code())
            .form_field("xqm", term.semester_code())
            .form_field("queryModel.showCount", page_size)
            .form_field("queryModel.currentPage", page)
            .form_field("queryModel.sortName", "")
            .form_field("queryModel.sortOrder", "asc")
            .form_field("_search", "false")
            .form_field("nd", epoch_millis())
            .form_field("time", 0)
            .xhr();
        self.send_authenticated(session, request, PortalEndpoints::GRADES).await
    }

    /// 查询单门课程的成绩明细（HTML 片段）
    pub async fn query_grade_detail(
        &self,
        session: &SessionClient,
        term: Term,
        course_name: &str,
        class_id: &str,
    ) -> AppResult<RawPortalResponse> {
        let request = PortalRequest::post(PortalEndpoints::GRADE_DETAIL)
            .query("time", epoch_millis())
            .query("gnmkdm", "N305005")
            .form_field("xnm", term.year_code())
            .form_field("xqm", term.semester_code())
            .form_field("kcmc", course_name)
            .form_field("jxb_id", class_id)
            .xhr();
        self.send_authenticated(session, request, PortalEndpoints::GRADE_DETAIL).await
    }

    /// 查询考试安排
    pub async fn query_exams(&self, session: &SessionClient, term: Term) -> AppResult<RawPortalResponse> {
        let request = PortalRequest::post(PortalEndpoints::EXAMS)
            .query("doType", "query")
            .query("gnmkdm", "N358105")
            .form_field("xnm", term.year_code())
            .form_field("xqm", term.semester_code())
            .form_field("queryModel.showCount", self.exam_page_size)
            .form_field("queryModel.currentPage", 1)
            .form_field("queryModel.sortName", "")
            .form_field("queryModel.sortOrder", "asc")
            .xhr();
        self.send_authenticated(session, request, PortalEndpoints::EXAMS).await
    }

    /// 查询首页校历区块
    pub async fn query_calendar(&self, session: &SessionClient) -> AppResult<RawPortalResponse> {
        self.query_index_area(session, PortalEndpoints::CALENDAR).await
    }

    /// 查询首页调课通知区块
    pub async fn query_course_notices(&self, session: &SessionClient) -> AppResult<RawPortalResponse> {
        self.query_index_area(session, PortalEndpoints::COURSE_NOTICES).await
    }

    /// 查询首页停补课通知区块
    pub async fn query_reschedule_notices(&self, session: &SessionClient) -> AppResult<RawPortalResponse> {
        self.query_index_area(session, PortalEndpoints::RESCHEDULE_NOTICES).await
    }

    async fn query_index_area(&self, session: &SessionClient, endpoint: &'static str) -> AppResult<RawPortalResponse> {
        let request = PortalRequest::post(endpoint)
            .query("localeKey", "zh_CN")
            .query("gnmkdm", "index")
            .xhr();
        self.send_authenticated(session, request, endpoint).await
    }

    /// 按学院、年级、专业查询培养方案
    pub async fn query_plan_info(
        &self,
        session: &SessionClient,
        college_id: &str,
        grade: &str,
        major_id: &str,
    ) -> AppResult<RawPortalResponse> {
        let request = paged(
            PortalRequest::post(PortalEndpoints::PLAN_INFO)
                .query("doType", "query")
                .query("gnmkdm", "N153540")
                .form_field("jg_id", college_id)
                .form_field("njdm_id", grade)
                .form_field("zyh_id", major_id),
            self.grade_page_size,
        );
        self.send_authenticated(session, request, PortalEndpoints::PLAN_INFO).await
    }

    /// 查询培养方案中的全部课程
    pub async fn query_plan_courses(&self, session: &SessionClient, plan_id: &str) -> AppResult<RawPortalResponse> {
        let request = paged(
            PortalRequest::post(PortalEndpoints::PLAN_COURSES)
                .query("doType", "query")
                .query("gnmkdm", "N153540")
                .form_field("jxzxjhxx_id", plan_id),
            PLAN_COURSE_PAGE_SIZE,
        );
        self.send_authenticated(session, request, PortalEndpoints::PLAN_COURSES).await
    }

    async fn send_authenticated(
        &self,
        session: &SessionClient,
        request: PortalRequest,
        endpoint: &str,
    ) -> AppResult<RawPortalResponse> {
        let response = session.send(request).await?;
        ensure_session(response, session, endpoint)
    }
}

fn paged(request: PortalRequest, page_size: u32) -> PortalRequest {
    request
        .form_field("queryModel.showCount", page_size)
        .form_field("queryModel.currentPage", 1)
        .form_field("queryModel.sortName", "")
        .form_field("queryModel.sortOrder", "asc")
        .form_field("_search", "false")
        .form_field("nd", epoch_millis())
}

/// 查询接口的会话判断
///
/// 登录页、901、站内重定向都说明会话失效；站外重定向和异常状态码原样上报。
pub fn ensure_session(
    response: RawPortalResponse,
    session: &SessionClient,
    endpoint: &str,
) -> AppResult<RawPortalResponse> {
    match page_classifier::classify(&response, session.base_url()) {
        page if page.requires_login() => {
            warn!("⚠️ 会话已失效 ({}): {:?}", endpoint, page);
            Err(PortalError::SessionExpired)
        }
        PortalPage::DashboardRedirect { location } => {
            warn!("⚠️ 查询被重定向 ({} → {})，按会话失效处理", endpoint, location);
            Err(PortalError::SessionExpired)
        }
        PortalPage::ForeignRedirect { location } => Err(PortalError::UnexpectedRedirect { location }),
        PortalPage::Unexpected { status } => Err(PortalError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status,
        }),
        _ => Ok(response),
    }
}

fn expect_success(response: RawPortalResponse, endpoint: &str) -> AppResult<RawPortalResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(PortalError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status: response.status,
        })
    }
}
