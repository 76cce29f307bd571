/// Version of the persisted local record layout
pub const SNAPSHOT_VERSION: u32 = 2;

/// Poll period of the poll-based provider, in seconds
pub const POLL_INTERVAL_SECS: u64 = 30;

/// Maximum number of posts a poll fetch returns
pub const POLL_FETCH_LIMIT: usize = 50;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Identifier of the seeded administrator account
pub const ADMIN_EMAIL: &str = "admin@qifa.com";

/// Chat session titles
pub const NEW_SESSION_TITLE: &str = "新对话";
pub const GUEST_SESSION_TITLE: &str = "游客会话";
pub const LEGACY_SESSION_TITLE: &str = "历史对话";

/// Display name given to guest profiles
pub const GUEST_NAME: &str = "游客";

/// Bot greeting placed in the first session of a fresh install
pub const BOT_GREETING: &str = "你好！我是你的留学助手。有什么我可以帮你的吗？";

/// Bot reply when the active provider mode has no text generation
pub const GENERATION_UNAVAILABLE: &str = "提示：由于 Google Gemini AI 在中国大陆无法访问，智能助手当前处于离线模式。请切换到全球模式或挂载 VPN 使用完整 AI 功能。但您的任务和社区功能依然正常可用。";

/// Bot reply when a generation fails or no generator is configured
pub const GENERATION_FAILED: &str = "AI 服务连接失败";

/// Name of the task-creation capability offered to the text generator
pub const CREATE_TASK_TOOL: &str = "createTask";
