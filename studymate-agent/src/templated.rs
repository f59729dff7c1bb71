//! Templated responder
//!
//! Picks a canned answer after a simulated delay. The family of answers
//! depends on keywords in the prompt and on the attached file, if any.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use studymate_core::config::ResponderConfig;
use studymate_core::session::{FileCategory, GeneratedMedia, MediaKind, UploadRecord};
use tracing::debug;

use crate::responder::{Reply, ReplyKind, Responder, ResponderResult, ResponseRequest};

pub const GENERAL: &[&str] = &[
    "That's a great question! Break the topic into its key ideas, then try explaining each one in your own words. Tell me which part feels least clear and we'll dig in.",
    "Here's a study tip: summarize what you already know in three sentences, then list the questions you still have. We can work through them one by one.",
    "Let's approach this step by step. Start with the definitions, look at one worked example, and then try a similar problem yourself.",
    "Good thinking! Connecting new material to something you already understand makes it stick. What does this remind you of from earlier lessons?",
    "I can help with that. Upload your notes or a textbook page and I can tailor the explanation to exactly what you're studying.",
];

pub const DOCUMENT: &[&str] = &[
    "I've read through \"{name}\". The main ideas are organised around a few core sections; I'd start by reviewing the headings and the first paragraph of each one.",
    "Based on \"{name}\", here's a suggestion: turn each section into two or three flashcards, then quiz yourself before moving on.",
    "\"{name}\" covers quite a lot. Ask me about any specific part and I'll explain it, summarise it, or write practice questions for it.",
];

pub const IMAGE: &[&str] = &[
    "I've looked at \"{name}\". Walk me through what the image is meant to show and I'll explain each labelled part.",
    "From \"{name}\" I can see a diagram worth memorising. Try redrawing it from memory, then compare it with the original.",
    "\"{name}\" is a useful visual. Want me to turn it into a short set of review questions?",
];

pub const TASK_LIST: &[&str] = &[
    "Here's a task list for \"{topic}\":\n1. Gather your notes and materials\n2. Review the key concepts\n3. Work through practice problems\n4. Summarise what you learned\n5. Test yourself without notes",
    "Task list for \"{topic}\":\n- [ ] Read the assigned material\n- [ ] Highlight unfamiliar terms\n- [ ] Write a one-page summary\n- [ ] Do ten practice questions\n- [ ] Review mistakes",
];

pub const PROJECT_PLAN: &[&str] = &[
    "Project plan for \"{topic}\":\nWeek 1: research and outline\nWeek 2: gather sources and draft the core sections\nWeek 3: revise, add visuals, check citations\nWeek 4: final review and submission",
    "Here's a plan for \"{topic}\":\nPhase 1 (planning): define the goal and scope\nPhase 2 (research): collect and organise material\nPhase 3 (execution): build the main deliverable\nPhase 4 (review): get feedback and polish",
];

pub const MEDIA: &[&str] = &[
    "Here's a visual for \"{topic}\". Use it as a memory aid when you review.",
    "I generated this for \"{topic}\". Try labelling each part yourself before checking your notes.",
];

const PLAN_KEYWORDS: &[&str] = &["plan", "plans", "planning", "roadmap", "schedule"];
const TASK_KEYWORDS: &[&str] = &["task", "tasks", "todo", "to-do", "checklist"];
const MEDIA_KEYWORDS: &[&str] = &[
    "draw",
    "generate an image",
    "generate a video",
    "picture of",
    "image of",
    "video of",
];

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether any phrase appears in `tokens` as a run of whole words
fn mentions(tokens: &[String], phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        let needle = words(phrase);
        tokens.windows(needle.len()).any(|run| run == needle.as_slice())
    })
}

/// Decide which family of answers fits the request
pub fn classify(prompt: &str, attachment: Option<&UploadRecord>) -> ReplyKind {
    let tokens = words(prompt);

    if mentions(&tokens, MEDIA_KEYWORDS) {
        ReplyKind::Media
    } else if mentions(&tokens, PLAN_KEYWORDS) {
        ReplyKind::ProjectPlan
    } else if mentions(&tokens, TASK_KEYWORDS) {
        ReplyKind::TaskList
    } else {
        match attachment.map(|a| a.category) {
            Some(FileCategory::Image) => ReplyKind::Image,
            Some(_) => ReplyKind::Document,
            None => ReplyKind::General,
        }
    }
}

/// The template set for a reply family
pub fn templates_for(kind: ReplyKind) -> &'static [&'static str] {
    match kind {
        ReplyKind::General => GENERAL,
        ReplyKind::Document => DOCUMENT,
        ReplyKind::Image => IMAGE,
        ReplyKind::TaskList => TASK_LIST,
        ReplyKind::ProjectPlan => PROJECT_PLAN,
        ReplyKind::Media => MEDIA,
    }
}

/// Canned-answer backend with simulated latency
#[derive(Debug)]
pub struct TemplatedResponder {
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl TemplatedResponder {
    pub fn new(config: &ResponderConfig) -> Self {
        Self {
            latency: Duration::from_millis(config.latency_ms),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic template choice, for tests and demos
    pub fn with_seed(config: &ResponderConfig, seed: u64) -> Self {
        Self {
            latency: Duration::from_millis(config.latency_ms),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick(&self, set: &'static [&'static str]) -> &'static str {
        let mut rng = self.rng.lock();
        set[rng.gen_range(0..set.len())]
    }
}

fn topic_of(prompt: &str) -> String {
    let topic = prompt.trim().trim_end_matches(['?', '.', '!']);
    studymate_core::utils::truncate(topic, 60)
}

fn render(template: &str, request: &ResponseRequest) -> String {
    let name = request
        .attachment
        .as_ref()
        .map(|a| a.name.as_str())
        .unwrap_or("your file");
    template
        .replace("{name}", name)
        .replace("{topic}", &topic_of(&request.prompt))
}

fn media_for(prompt: &str) -> GeneratedMedia {
    let kind = if prompt.to_lowercase().contains("video") {
        MediaKind::Video
    } else {
        MediaKind::Image
    };
    let label = match kind {
        MediaKind::Video => "video",
        MediaKind::Audio => "audio",
        MediaKind::Image => "image",
    };
    GeneratedMedia {
        kind,
        url: format!("generated://{}/{}", label, uuid::Uuid::new_v4()),
        prompt: prompt.trim().to_string(),
    }
}

#[async_trait]
impl Responder for TemplatedResponder {
    async fn respond(&self, request: ResponseRequest) -> ResponderResult<Reply> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let kind = classify(&request.prompt, request.attachment.as_ref());
        let template = self.pick(templates_for(kind));
        debug!(?kind, "Selected reply template");

        let generated_media = (kind == ReplyKind::Media).then(|| media_for(&request.prompt));

        Ok(Reply {
            text: render(template, &request),
            kind,
            template: Some(template),
            generated_media,
            grounding_links: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "templated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn instant() -> ResponderConfig {
        ResponderConfig { latency_ms: 0 }
    }

    fn upload(name: &str, category: FileCategory) -> UploadRecord {
        UploadRecord {
            id: "u1".to_string(),
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            size: 5,
            date: Utc::now(),
            content: Some("Hello".to_string()),
            category,
            original_image: None,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("summarize", None), ReplyKind::General);
        assert_eq!(classify("Make me a study PLAN", None), ReplyKind::ProjectPlan);
        assert_eq!(classify("give me a checklist", None), ReplyKind::TaskList);
        assert_eq!(classify("draw a neuron", None), ReplyKind::Media);

        let doc = upload("notes.txt", FileCategory::Text);
        assert_eq!(classify("summarize", Some(&doc)), ReplyKind::Document);
        let img = upload("cell.png", FileCategory::Image);
        assert_eq!(classify("what is this?", Some(&img)), ReplyKind::Image);
        // keywords win over the attachment
        assert_eq!(classify("task list please", Some(&doc)), ReplyKind::TaskList);
        assert_eq!(classify("my to-do for Monday", None), ReplyKind::TaskList);
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        assert_eq!(classify("Give me an explanation of osmosis", None), ReplyKind::General);
        assert_eq!(classify("Which planet is largest?", None), ReplyKind::General);
        assert_eq!(classify("symptoms of withdrawal", None), ReplyKind::General);
        assert_eq!(classify("is multitasking bad for studying", None), ReplyKind::General);

        let doc = upload("notes.txt", FileCategory::Text);
        assert_eq!(classify("explanation please", Some(&doc)), ReplyKind::Document);
        assert_eq!(classify("Plan: revise chapter 3", None), ReplyKind::ProjectPlan);
    }

    #[tokio::test]
    async fn test_general_reply_comes_from_general_set() {
        let responder = TemplatedResponder::with_seed(&instant(), 7);
        let reply = responder
            .respond(ResponseRequest::new("summarize"))
            .await
            .unwrap();

        assert_eq!(reply.kind, ReplyKind::General);
        assert!(GENERAL.contains(&reply.text.as_str()));
        assert_eq!(reply.template, Some(reply.text.as_str()));
        assert!(reply.generated_media.is_none());
    }

    #[tokio::test]
    async fn test_document_reply_names_the_file() {
        let responder = TemplatedResponder::with_seed(&instant(), 1);
        let request =
            ResponseRequest::new("explain").with_attachment(upload("notes.txt", FileCategory::Text));
        let reply = responder.respond(request).await.unwrap();

        assert_eq!(reply.kind, ReplyKind::Document);
        assert!(reply.text.contains("notes.txt"));
        assert!(DOCUMENT.contains(&reply.template.unwrap()));
    }

    #[tokio::test]
    async fn test_media_reply_attaches_generated_media() {
        let responder = TemplatedResponder::with_seed(&instant(), 3);
        let reply = responder
            .respond(ResponseRequest::new("generate a video of mitosis"))
            .await
            .unwrap();

        let media = reply.generated_media.unwrap();
        assert_eq!(media.kind, MediaKind::Video);
        assert!(media.url.starts_with("generated://video/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_simulated() {
        let responder = TemplatedResponder::new(&ResponderConfig { latency_ms: 1500 });
        let started = tokio::time::Instant::now();
        responder.respond(ResponseRequest::new("hi")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[test]
    fn test_topic_is_trimmed() {
        assert_eq!(topic_of("  biology exam plan?  "), "biology exam plan");
    }
}
