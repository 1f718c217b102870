//! 外部协作方接口
//!
//! 凭据存储和本地缓存由宿主应用提供，这里只定义接口和一个进程内实现。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;

use crate::models::{Credentials, ExamEntry, GradeRecord, Term, TimetableEntry};

/// 凭据存储，本模块不持久化明文密码
pub trait CredentialStore: Send + Sync {
    fn credentials(&self, account: &str) -> Option<Credentials>;
}

/// 本地缓存
///
/// 按 (学号, 学期) 先删后插整体替换，不做部分合并；用户手动添加的记录不受影响。
pub trait RecordCache: Send + Sync {
    fn replace_grades(&self, student_id: &str, term: Term, records: Vec<GradeRecord>) -> Result<()>;
    fn replace_timetable(&self, student_id: &str, term: Term, entries: Vec<TimetableEntry>) -> Result<()>;
    fn replace_exams(&self, student_id: &str, term: Term, exams: Vec<ExamEntry>) -> Result<()>;
    fn replace_notices(&self, student_id: &str, notices: Vec<String>) -> Result<()>;
}

/// 固定的账号表
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    accounts: HashMap<String, Credentials>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, credentials: Credentials) {
        self.accounts.insert(credentials.username.clone(), credentials);
    }
}

impl CredentialStore for StaticCredentialStore {
    fn credentials(&self, account: &str) -> Option<Credentials> {
        self.accounts.get(account).cloned()
    }
}

/// 缓存中的一条记录，`is_custom` 为用户手动添加
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub is_custom: bool,
}

type TermKey = (String, Term);

#[derive(Debug, Default)]
struct CacheTables {
    grades: HashMap<TermKey, Vec<Cached<GradeRecord>>>,
    timetable: HashMap<TermKey, Vec<Cached<TimetableEntry>>>,
    exams: HashMap<TermKey, Vec<Cached<ExamEntry>>>,
    notices: HashMap<String, Vec<String>>,
}

/// 进程内缓存
#[derive(Debug, Default)]
pub struct MemoryCache {
    tables: Mutex<CacheTables>,
}

fn replace_synced<T>(rows: &mut Vec<Cached<T>>, fresh: Vec<T>) {
    rows.retain(|row| row.is_custom);
    rows.extend(fresh.into_iter().map(|value| Cached {
        value,
        is_custom: false,
    }));
}

fn values<T: Clone>(rows: Option<&Vec<Cached<T>>>) -> Vec<T> {
    rows.map(|rows| rows.iter().map(|row| row.value.clone()).collect())
        .unwrap_or_default()
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheTables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 用户手动添加的考试，同步时保留
    pub fn add_custom_exam(&self, student_id: &str, term: Term, exam: ExamEntry) {
        self.lock()
            .exams
            .entry((student_id.to_string(), term))
            .or_default()
            .push(Cached {
                value: exam,
                is_custom: true,
            });
    }

    /// 用户手动添加的课程，同步时保留
    pub fn add_custom_course(&self, student_id: &str, term: Term, entry: TimetableEntry) {
        self.lock()
            .timetable
            .entry((student_id.to_string(), term))
            .or_default()
            .push(Cached {
                value: entry,
                is_custom: true,
            });
    }

    pub fn grades(&self, student_id: &str, term: Term) -> Vec<GradeRecord> {
        values(self.lock().grades.get(&(student_id.to_string(), term)))
    }

    /// 某个学生所有学期的成绩，按学期排序
    pub fn all_grades(&self, student_id: &str) -> Vec<GradeRecord> {
        let tables = self.lock();
        let mut keys: Vec<&TermKey> = tables
            .grades
            .keys()
            .filter(|(student, _)| student == student_id)
            .collect();
        keys.sort_by_key(|(_, term)| *term);
        keys.into_iter()
            .flat_map(|key| values(tables.grades.get(key)))
            .collect()
    }

    pub fn timetable(&self, student_id: &str, term: Term) -> Vec<TimetableEntry> {
        values(self.lock().timetable.get(&(student_id.to_string(), term)))
    }

    pub fn exams(&self, student_id: &str, term: Term) -> Vec<ExamEntry> {
        values(self.lock().exams.get(&(student_id.to_string(), term)))
    }

    pub fn notices(&self, student_id: &str) -> Vec<String> {
        self.lock().notices.get(student_id).cloned().unwrap_or_default()
    }
}

impl RecordCache for MemoryCache {
    fn replace_grades(&self, student_id: &str, term: Term, records: Vec<GradeRecord>) -> Result<()> {
        let mut tables = self.lock();
        replace_synced(tables.grades.entry((student_id.to_string(), term)).or_default(), records);
        Ok(())
    }

    fn replace_timetable(&self, student_id: &str, term: Term, entries: Vec<TimetableEntry>) -> Result<()> {
        let mut tables = self.lock();
        replace_synced(tables.timetable.entry((student_id.to_string(), term)).or_default(), entries);
        Ok(())
    }

    fn replace_exams(&self, student_id: &str, term: Term, exams: Vec<ExamEntry>) -> Result<()> {
        let mut tables = self.lock();
        replace_synced(tables.exams.entry((student_id.to_string(), term)).or_default(), exams);
        Ok(())
    }

    fn replace_notices(&self, student_id: &str, notices: Vec<String>) -> Result<()> {
        self.lock().notices.insert(student_id.to_string(), notices);
        Ok(())
    }
}
