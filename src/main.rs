use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use portal_engine::models::{CourseFilter, SortOrder, Term};
use portal_engine::utils::logging;
use portal_engine::{
    Config, Credentials, GpaEngine, MemoryCache, StaticCredentialStore, SyncProcessor,
};

/// 加载配置：优先 `PORTAL_CONFIG` 指向的 TOML 文件，否则读环境变量
fn load_config() -> Result<Config> {
    let config = match std::env::var("PORTAL_CONFIG") {
        Ok(path) => Config::from_toml_file(&path)
            .with_context(|| format!("加载配置文件失败: {}", path))?,
        Err(_) => Config::from_env(),
    };
    config.validate().context("配置无效")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    let username = std::env::var("PORTAL_USERNAME").context("缺少环境变量 PORTAL_USERNAME")?;
    let password = std::env::var("PORTAL_PASSWORD").context("缺少环境变量 PORTAL_PASSWORD")?;

    let mut store = StaticCredentialStore::new();
    store.insert(Credentials::new(username.clone(), password));

    let cache = Arc::new(MemoryCache::new());
    let processor = SyncProcessor::new(config, cache.clone());
    let stats = processor.sync_all(&store, &[username.clone()]).await?;
    if stats.success == 0 {
        bail!("账号 {} 同步失败", username);
    }

    print_summary(&cache, &username);
    Ok(())
}

fn print_summary(cache: &MemoryCache, student_id: &str) {
    let current = Term::current_local();
    let today = chrono::Local::now().date_naive();

    info!("\n{}", "=".repeat(60));
    info!("📚 {} 课表: {} 条", current, cache.timetable(student_id, current).len());

    let mut upcoming: Vec<_> = cache
        .exams(student_id, current)
        .into_iter()
        .filter_map(|exam| exam.days_until(today).filter(|d| *d >= 0).map(|d| (d, exam)))
        .collect();
    upcoming.sort_by_key(|(days, _)| *days);
    info!("📝 即将到来的考试: {} 场", upcoming.len());
    for (days, exam) in &upcoming {
        info!(
            "  {} 天后 | {} | {} | {}",
            days,
            exam.course_name,
            exam.exam_time_raw,
            exam.location_label()
        );
    }

    let notices = cache.notices(student_id);
    info!("📢 通知: {} 条", notices.len());
    for notice in &notices {
        info!("  {}", logging::truncate_text(&notice.replace('\n', " "), 80));
    }

    let engine = GpaEngine::default();
    let courses = engine.prepare(&cache.all_grades(student_id), None);
    let report = engine.aggregate(&courses, CourseFilter::All, SortOrder::Descending);
    info!("{}", "=".repeat(60));
    info!(
        "🎓 总绩点 {} (学分 {}) | 学位课绩点 {} (学分 {})",
        report.stats.total_gpa,
        report.stats.total_credits,
        report.stats.degree_gpa,
        report.stats.degree_credits
    );
    info!("{}", "=".repeat(60));
}
