//! Task Seeding - 从数据库记录生成初始任务
//!
//! 每个用户一条任务，引用该用户最近上传的参考音频

use serde::Serialize;

use crate::application::ports::VoiceSampleRecord;

/// 生成任务时使用的固定内容
#[derive(Debug, Clone)]
pub struct SeedTemplate {
    pub text: String,
    pub output_file_name: String,
    /// 下载地址模板，支持 `{file_id}` 与 `{user_id}`
    pub file_url_template: String,
    pub callback_url: Option<String>,
    pub response_queue: Option<String>,
}

/// 种子任务中的文件条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedFile {
    pub file_url: String,
    pub file_id: i64,
    pub file_name: String,
    pub file_hash: String,
}

/// 种子任务（入站消息格式）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedTask {
    pub user_id: i64,
    pub files: Vec<SeedFile>,
    pub text: String,
    pub output_file_name: String,
    pub auth_token: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(rename = "queueResponse", skip_serializing_if = "Option::is_none")]
    pub response_queue: Option<String>,
}

/// 按用户分组生成任务
///
/// 输入需按 user_id 聚集（仓储查询保证）；输出按 user_id 升序，
/// 文件保持输入顺序。
pub fn build_seed_tasks(mut records: Vec<VoiceSampleRecord>, template: &SeedTemplate) -> Vec<SeedTask> {
    // 稳定排序，同一用户内保持查询给出的顺序
    records.sort_by_key(|r| r.user_id);

    records
        .chunk_by(|a, b| a.user_id == b.user_id)
        .map(|group| {
            let user_id = group[0].user_id;
            SeedTask {
                user_id,
                files: group
                    .iter()
                    .map(|record| SeedFile {
                        file_url: render_file_url(&template.file_url_template, record),
                        file_id: record.file_id,
                        file_name: record.file_name.clone(),
                        file_hash: record.file_hash.clone(),
                    })
                    .collect(),
                text: template.text.clone(),
                output_file_name: template.output_file_name.clone(),
                auth_token: user_id,
                callback_url: template.callback_url.clone(),
                response_queue: template.response_queue.clone(),
            }
        })
        .collect()
}

fn render_file_url(template: &str, record: &VoiceSampleRecord) -> String {
    template
        .replace("{file_id}", &record.file_id.to_string())
        .replace("{user_id}", &record.user_id.to_string())
}
