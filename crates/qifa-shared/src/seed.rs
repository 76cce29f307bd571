//! Records present on a fresh install: the administrator account, the
//! recommended task catalog and the starter study-resource library.

use crate::constants::ADMIN_EMAIL;
use crate::models::{StudyResource, Task, UserProfile};
use crate::types::*;

/// The built-in administrator profile. It is re-added on every load if missing.
pub fn admin_profile() -> UserProfile {
    UserProfile {
        name: "系统管理员".into(),
        email: ADMIN_EMAIL.into(),
        phone: "13800000000".into(),
        student_id: "000".into(),
        school: "System".into(),
        degree_level: "PhD".into(),
        program: "Administration".into(),
        start_date: "2023-09-01".into(),
        current_location: "Paris".into(),
        target_city: "Paris".into(),
        role: UserRole::Admin,
        status: UserStatus::Active,
        is_online: true,
    }
}

/// A catalog entry the user can accept into their own task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub category: TaskCategory,
    pub priority: Priority,
}

impl TaskTemplate {
    /// Instantiate as a fresh TODO task with a new id.
    pub fn to_task(&self, id: String, due_date: Option<String>) -> Task {
        Task {
            id,
            title: self.title.to_string(),
            category: self.category,
            status: TaskStatus::Todo,
            priority: self.priority,
            due_date,
        }
    }
}

macro_rules! template {
    ($id:literal, $title:literal, $category:ident, $priority:ident) => {
        TaskTemplate {
            id: $id,
            title: $title,
            category: TaskCategory::$category,
            priority: Priority::$priority,
        }
    };
}

pub static RECOMMENDED_TASKS: [TaskTemplate; 12] = [
    template!("r1", "办理长期留学签证 (VLS-TS)", PreDeparture, High),
    template!("r2", "购买赴法机票", PreDeparture, High),
    template!("r3", "购买留学保险 (CVEC缴纳)", PreDeparture, High),
    template!("r4", "寻找并预定法国住宿", PreDeparture, High),
    template!("r5", "出生公证双认证", PreDeparture, Medium),
    template!("r6", "注册法国医保 (Ameli)", Arrival, High),
    template!("r7", "法国银行开户 (RIB)", Arrival, High),
    template!("r8", "办理 OFII 居留生效", Arrival, High),
    template!("r9", "办理交通卡 (Navigo/Imagine R)", Life, Medium),
    template!("r10", "申请房补 (CAF)", Life, High),
    template!("r11", "学校行政注册 (Inscription)", Study, High),
    template!("r12", "阅读专业预习书单", Study, Medium),
];

pub fn find_template(id: &str) -> Option<&'static TaskTemplate> {
    RECOMMENDED_TASKS.iter().find(|t| t.id == id)
}

/// Catalog entries in `category` whose title is not already on the list.
pub fn available_templates(category: TaskCategory, tasks: &[Task]) -> Vec<&'static TaskTemplate> {
    RECOMMENDED_TASKS
        .iter()
        .filter(|t| t.category == category)
        .filter(|t| !tasks.iter().any(|task| task.title == t.title))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn resource(
    id: &str,
    title: &str,
    category: ResourceCategory,
    description: &str,
    author: &str,
    download_count: u64,
    size: &str,
    file_type: FileType,
    upload_date: &str,
) -> StudyResource {
    StudyResource {
        id: id.into(),
        title: title.into(),
        category,
        description: description.into(),
        author: author.into(),
        download_count,
        size: size.into(),
        file_type,
        upload_date: upload_date.into(),
        source: None,
    }
}

pub fn seed_resources() -> Vec<StudyResource> {
    use FileType::*;
    use ResourceCategory::*;

    vec![
        resource(
            "res-1",
            "Kedge商学院交换项目全流程指南 (2024版)",
            ExchangeGuide,
            "包含申请时间线、选课策略及学分转换对照表。",
            "教务处 & 21届学长",
            1240,
            "2.4 MB",
            Pdf,
            "2024-05-15",
        ),
        resource(
            "res-2",
            "蒙彼利埃三大 - FLE语言学期末重点总结",
            CourseNote,
            "针对L3阶段语言学概论课程的复习笔记，涵盖常考名词解释。",
            "19届学姐 Y.Li",
            856,
            "5.1 MB",
            Pdf,
            "2023-12-10",
        ),
        resource(
            "res-3",
            "TCF/TEF 听力高频词汇表 (B2-C1)",
            LanguagePrep,
            "出国前备考必备，整理了近3年机考听力部分的高频场景词。",
            "法语教研组",
            3421,
            "1.2 MB",
            Doc,
            "2024-01-20",
        ),
        resource(
            "res-4",
            "宏观经济学往年真题 (2020-2023)",
            ExamPaper,
            "索邦大学经济系L2期末考试真题合集，含参考答案。",
            "匿名",
            567,
            "15 MB",
            Zip,
            "2024-06-01",
        ),
        resource(
            "res-5",
            "中法项目重修流程说明书",
            ExchangeGuide,
            "挂科后如何申请重修？法国成绩如何认定？官方详细解读。",
            "学院办公室",
            230,
            "0.8 MB",
            Pdf,
            "2024-02-15",
        ),
        resource(
            "res-6",
            "Marketing Strategic 课程Presentation模板",
            CourseNote,
            "商科高分Pre模板，包含SWOT分析及竞品调研框架。",
            "20届学长 David",
            1102,
            "8.5 MB",
            Zip,
            "2023-11-05",
        ),
    ]
}
