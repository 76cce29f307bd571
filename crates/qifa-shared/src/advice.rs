//! Profile-tailored advice for the home page and each task category.
//!
//! The advice is pure table lookup: a coarse region tag is derived from the
//! target city and program-family flags from the declared program, then each
//! scope's base items are extended by the branches whose conditions hold.
//! Output depends only on `(profile, scope)`.

use serde::Serialize;

use crate::models::UserProfile;
use crate::types::TaskCategory;

pub const ADVICE_TABLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdviceScope {
    Home,
    PreDeparture,
    Arrival,
    Life,
    Study,
}

impl From<TaskCategory> for AdviceScope {
    fn from(category: TaskCategory) -> Self {
        match category {
            TaskCategory::PreDeparture => Self::PreDeparture,
            TaskCategory::Arrival => Self::Arrival,
            TaskCategory::Life => Self::Life,
            TaskCategory::Study => Self::Study,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdviceKind {
    Urgent,
    Tip,
    Checklist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdviceItem {
    pub id: &'static str,
    pub icon: &'static str,
    pub text: &'static str,
    #[serde(rename = "type")]
    pub kind: AdviceKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmartAdvice {
    pub title: String,
    pub description: String,
    pub items: Vec<AdviceItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    Paris,
    South,
    Alps,
    North,
    Other,
}

const REGION_KEYWORDS: &[(Region, &[&str])] = &[
    (Region::Paris, &["Paris", "巴黎"]),
    (Region::South, &["Nice", "Marseille", "Montpellier", "Toulouse", "Bordeaux"]),
    (Region::Alps, &["Grenoble", "Annecy"]),
    (Region::North, &["Lille", "Rouen", "Strasbourg"]),
];

pub fn region_of(city: &str) -> Region {
    REGION_KEYWORDS
        .iter()
        .find(|(_, keys)| keys.iter().any(|k| city.contains(k)))
        .map(|(region, _)| *region)
        .unwrap_or(Region::Other)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramFamily {
    Art,
    Engineering,
    Business,
}

const PROGRAM_KEYWORDS: &[(ProgramFamily, &[&str])] = &[
    (ProgramFamily::Art, &["Art", "Design", "Fashion", "设计", "艺术"]),
    (ProgramFamily::Engineering, &["Engineer", "Science", "工程", "理工"]),
    (ProgramFamily::Business, &["Business", "Management", "商"]),
];

/// Tags derived from a profile. A program can belong to several families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileTags {
    pub region: Region,
    art: bool,
    engineering: bool,
    business: bool,
}

impl ProfileTags {
    pub fn of(profile: &UserProfile) -> Self {
        let has = |family: ProgramFamily| {
            PROGRAM_KEYWORDS
                .iter()
                .filter(|(f, _)| *f == family)
                .any(|(_, keys)| keys.iter().any(|k| profile.program.contains(k)))
        };
        Self {
            region: region_of(&profile.target_city),
            art: has(ProgramFamily::Art),
            engineering: has(ProgramFamily::Engineering),
            business: has(ProgramFamily::Business),
        }
    }

    pub fn in_family(&self, family: ProgramFamily) -> bool {
        match family {
            ProgramFamily::Art => self.art,
            ProgramFamily::Engineering => self.engineering,
            ProgramFamily::Business => self.business,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Condition {
    Always,
    InRegion(&'static [Region]),
    Program(ProgramFamily),
}

impl Condition {
    fn holds(&self, tags: &ProfileTags) -> bool {
        match self {
            Condition::Always => true,
            Condition::InRegion(regions) => regions.contains(&tags.region),
            Condition::Program(family) => tags.in_family(*family),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Branch {
    /// Append the items when the condition holds.
    When(Condition, &'static [AdviceItem]),
    /// Append the items of the first arm whose condition holds.
    FirstOf(&'static [(Condition, &'static [AdviceItem])]),
}

#[derive(Debug, Clone, Copy)]
pub struct ScopeAdvice {
    pub scope: AdviceScope,
    pub title: &'static str,
    /// May reference `{city}`, `{program}` and `{degree}`.
    pub description: &'static str,
    pub base: &'static [AdviceItem],
    pub branches: &'static [Branch],
}

macro_rules! item {
    ($id:literal, $icon:literal, $text:literal, $kind:ident) => {
        AdviceItem { id: $id, icon: $icon, text: $text, kind: AdviceKind::$kind }
    };
}

pub static ADVICE_TABLE: [ScopeAdvice; 5] = [
    ScopeAdvice {
        scope: AdviceScope::Home,
        title: "AI 智能洞察",
        description: "基于你的档案 ({city} / {program}) 生成的个性化建议",
        base: &[],
        branches: &[
            Branch::FirstOf(&[
                (
                    Condition::InRegion(&[Region::Paris]),
                    &[
                        item!("h1", "🚇", "你将前往巴黎地区，建议提前了解 \"Navigo\" 交通卡的分区计费规则。", Tip),
                        item!("h2", "🏠", "巴黎租房市场非常紧张，建议提前 2-3 个月开始寻找担保人 (Garant)。", Urgent),
                    ],
                ),
                (
                    Condition::InRegion(&[Region::South]),
                    &[item!("h3", "☀️", "南部阳光充足，但早晚温差大，记得准备墨镜和防风外套。", Tip)],
                ),
                (
                    Condition::InRegion(&[Region::Alps]),
                    &[item!("h4", "🏔️", "格勒诺布尔群山环绕，冬季寒冷，请务必准备高品质的羽绒服和登山鞋。", Urgent)],
                ),
            ]),
            Branch::When(
                Condition::Program(ProgramFamily::Art),
                &[item!("h5", "🎨", "艺术生请注意：大部分画材在法国较贵，建议从国内携带常用画笔和颜料。", Tip)],
            ),
        ],
    },
    ScopeAdvice {
        scope: AdviceScope::PreDeparture,
        title: "智能行李与签证清单",
        description: "针对 {city} 的气候及 {degree} 签证要求",
        base: &[
            item!("l1", "📄", "重要文件原件 (护照/录取信/出生公证/证件照x10)", Urgent),
            item!("l2", "🔌", "欧标转换插头 x 2 + 多口插线板", Checklist),
            item!("l3", "💊", "常用药品 (消炎药/感冒药/肠胃药 - 法国买抗生素需处方)", Checklist),
        ],
        branches: &[
            Branch::FirstOf(&[
                (
                    Condition::InRegion(&[Region::Paris, Region::North]),
                    &[
                        item!("l4", "☔️", "结实的折叠伞 (这里雨水频繁)", Checklist),
                        item!("l5", "🧥", "防雨冲锋衣或风衣", Checklist),
                    ],
                ),
                (
                    Condition::InRegion(&[Region::South]),
                    &[
                        item!("l6", "🕶️", "墨镜和高倍防晒霜 (必备)", Checklist),
                        item!("l7", "🩳", "夏装和泳衣", Checklist),
                    ],
                ),
            ]),
            Branch::When(
                Condition::Program(ProgramFamily::Engineering),
                &[item!("l8", "💻", "高性能笔记本电脑 (法语键盘布局不同，建议自带)", Tip)],
            ),
        ],
    },
    ScopeAdvice {
        scope: AdviceScope::Arrival,
        title: "落地安家向导",
        description: "抵达法国第一周必须完成的关键事项",
        base: &[
            item!("a1", "🏦", "预约银行开户 (建议 BNP, Société Générale 或 LCL)", Urgent),
            item!("a2", "📱", "办理手机卡 (Free Mobile 便宜量大，Orange 信号最好)", Checklist),
            item!("a3", "🎫", "激活 VLS-TS 签证 (务必在落地3个月内完成)", Urgent),
            item!("a4", "🏠", "申请 CAF 房补 (拿到住房合同后立即申请)", Tip),
        ],
        branches: &[Branch::When(
            Condition::InRegion(&[Region::Paris]),
            &[item!("a5", "🚇", "办理 Imagine R 学生交通卡 (比普通月票便宜很多)", Tip)],
        )],
    },
    ScopeAdvice {
        scope: AdviceScope::Study,
        title: "学业衔接建议",
        description: "针对 {program} 专业的特定建议",
        base: &[
            item!("s1", "🎓", "完成学校行政注册 (Inscription Administrative)", Urgent),
            item!("s2", "📅", "下载学校课表 App / 确认 Moodle 账号", Checklist),
        ],
        branches: &[Branch::FirstOf(&[
            (
                Condition::Program(ProgramFamily::Art),
                &[
                    item!("s3", "🎨", "准备作品集 (Portfolio) 用于开学展示", Tip),
                    item!("s4", "🏛️", "办理卢浮宫/奥赛博物馆青年卡 (艺术生常需临摹)", Tip),
                ],
            ),
            (
                Condition::Program(ProgramFamily::Business),
                &[
                    item!("s5", "👔", "准备一套正式西装/正装 (用于 Presentation 和面试)", Checklist),
                    item!("s6", "🤝", "更新 LinkedIn 个人档案为英/法双语", Tip),
                ],
            ),
            (
                Condition::Always,
                &[item!("s7", "📚", "寻找上一届学长学姐购买二手教材", Tip)],
            ),
        ])],
    },
    ScopeAdvice {
        scope: AdviceScope::Life,
        title: "生活小贴士",
        description: "像当地人一样生活",
        base: &[
            item!("lf1", "🛒", "周日大部分超市关门，记得周六备货", Tip),
            item!("lf2", "🩺", "注册 Doctolib App，方便预约医生", Checklist),
            item!("lf3", "🍽️", "申请 CROUS 食堂卡，享受 1 欧元(或低价)午餐", Tip),
        ],
        branches: &[],
    },
];

fn render(template: &str, profile: &UserProfile) -> String {
    template
        .replace("{city}", &profile.target_city)
        .replace("{program}", &profile.program)
        .replace("{degree}", &profile.degree_level)
}

/// Advice for `scope` tailored to `profile`, or `None` if the table has no
/// entry for the scope.
pub fn recommend(profile: &UserProfile, scope: AdviceScope) -> Option<SmartAdvice> {
    recommend_from(&ADVICE_TABLE, profile, scope)
}

pub fn recommend_from(
    table: &[ScopeAdvice],
    profile: &UserProfile,
    scope: AdviceScope,
) -> Option<SmartAdvice> {
    let entry = table.iter().find(|e| e.scope == scope)?;
    let tags = ProfileTags::of(profile);

    let mut items: Vec<AdviceItem> = entry.base.to_vec();
    for branch in entry.branches {
        match branch {
            Branch::When(cond, extra) => {
                if cond.holds(&tags) {
                    items.extend_from_slice(extra);
                }
            }
            Branch::FirstOf(arms) => {
                if let Some((_, extra)) = arms.iter().find(|(cond, _)| cond.holds(&tags)) {
                    items.extend_from_slice(extra);
                }
            }
        }
    }

    Some(SmartAdvice {
        title: entry.title.to_string(),
        description: render(entry.description, profile),
        items,
    })
}
