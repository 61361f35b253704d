// tests/common/mod.rs
#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use brevet_backend::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        attempt::{QuizAttempt, QuizResult, QuizSubmission, QuizTempSubmission},
        question::{NewQuestion, QuestionWithOptions, QuizOption, QuizQuestion},
        quiz::{CreateQuizRequest, Quiz, QuizListParams},
    },
    repositories::{
        AnswerKey, AttemptRepository, MeetingDirectory, PurchaseLedger, QuizRepository, Scorer,
    },
    routes,
    state::AppState,
    utils::jwt::sign_jwt,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

#[derive(Default)]
struct Data {
    next_id: i64,
    quizzes: BTreeMap<i64, Quiz>,
    questions: BTreeMap<i64, QuizQuestion>,
    options: BTreeMap<i64, QuizOption>,
    attempts: BTreeMap<i64, QuizAttempt>,
    drafts: BTreeMap<(i64, i64), QuizTempSubmission>,
    submissions: Vec<QuizSubmission>,
    results: Vec<QuizResult>,
    /// meeting id -> (batch id, teacher id)
    meetings: HashMap<i64, (i64, i64)>,
    paid: HashSet<(i64, i64)>,
}

impl Data {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory stand-in for Postgres and the course/purchase modules.
/// One mutex makes every trait method atomic, like a transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    data: Arc<Mutex<Data>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_meeting(&self, meeting_id: i64, batch_id: i64, teacher_id: i64) {
        self.data.lock().await.meetings.insert(meeting_id, (batch_id, teacher_id));
    }

    pub async fn mark_paid(&self, user_id: i64, batch_id: i64) {
        self.data.lock().await.paid.insert((user_id, batch_id));
    }

    pub async fn question_count(&self, quiz_id: i64) -> usize {
        let data = self.data.lock().await;
        data.questions.values().filter(|q| q.quiz_id == quiz_id).count()
    }

    pub async fn attempt_count(&self, quiz_id: i64, user_id: i64) -> usize {
        let data = self.data.lock().await;
        data.attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id)
            .count()
    }

    pub async fn active_attempt_count(&self, quiz_id: i64, user_id: i64) -> usize {
        let data = self.data.lock().await;
        data.attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id && a.ended_at.is_none())
            .count()
    }

    pub async fn draft_count(&self, attempt_id: i64) -> usize {
        let data = self.data.lock().await;
        data.drafts.keys().filter(|(a, _)| *a == attempt_id).count()
    }

    pub async fn submission_count(&self, attempt_id: i64) -> usize {
        let data = self.data.lock().await;
        data.submissions.iter().filter(|s| s.attempt_id == attempt_id).count()
    }

    pub async fn results(&self) -> Vec<QuizResult> {
        self.data.lock().await.results.clone()
    }
}

#[async_trait]
impl QuizRepository for InMemoryStore {
    async fn create(&self, req: &CreateQuizRequest) -> AppResult<Quiz> {
        let mut data = self.data.lock().await;
        let now = Utc::now();
        let quiz = Quiz {
            id: data.id(),
            meeting_id: req.meeting_id,
            title: req.title.clone(),
            description: req.description.clone(),
            quiz_type: req.quiz_type,
            is_open: req.is_open,
            start_time: req.start_time,
            end_time: req.end_time,
            duration_minute: req.duration_minute,
            max_attempts: req.max_attempts,
            created_at: now,
            updated_at: now,
        };
        data.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn update(&self, quiz: &Quiz) -> AppResult<Quiz> {
        let mut data = self.data.lock().await;
        let stored = data
            .quizzes
            .get_mut(&quiz.id)
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz.id)))?;
        *stored = Quiz {
            updated_at: Utc::now(),
            ..quiz.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut data = self.data.lock().await;
        if data.quizzes.remove(&id).is_none() {
            return Ok(false);
        }

        let question_ids: HashSet<i64> = data
            .questions
            .values()
            .filter(|q| q.quiz_id == id)
            .map(|q| q.id)
            .collect();
        data.questions.retain(|_, q| q.quiz_id != id);
        data.options.retain(|_, o| !question_ids.contains(&o.question_id));

        let attempt_ids: HashSet<i64> = data
            .attempts
            .values()
            .filter(|a| a.quiz_id == id)
            .map(|a| a.id)
            .collect();
        data.attempts.retain(|_, a| a.quiz_id != id);
        data.drafts.retain(|(a, _), _| !attempt_ids.contains(a));
        data.submissions.retain(|s| !attempt_ids.contains(&s.attempt_id));
        for result in data.results.iter_mut() {
            if result.attempt_id.is_some_and(|a| attempt_ids.contains(&a)) {
                result.attempt_id = None;
            }
        }
        Ok(true)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Quiz>> {
        Ok(self.data.lock().await.quizzes.get(&id).cloned())
    }

    async fn list_by_meeting(&self, meeting_id: i64, params: &QuizListParams) -> AppResult<Vec<Quiz>> {
        let data = self.data.lock().await;
        let search = params.search.as_deref().map(str::to_lowercase);
        let mut quizzes: Vec<Quiz> = data
            .quizzes
            .values()
            .filter(|q| q.meeting_id == meeting_id)
            .filter(|q| params.is_open.is_none_or(|open| q.is_open == open))
            .filter(|q| params.quiz_type.is_none_or(|t| q.quiz_type == t))
            .filter(|q| {
                search
                    .as_deref()
                    .is_none_or(|s| q.title.to_lowercase().contains(s))
            })
            .cloned()
            .collect();
        quizzes.sort_by_key(|q| (q.start_time, q.id));
        Ok(quizzes)
    }

    async fn questions_with_options(&self, quiz_id: i64) -> AppResult<Vec<QuestionWithOptions>> {
        let data = self.data.lock().await;
        Ok(data
            .questions
            .values()
            .filter(|q| q.quiz_id == quiz_id)
            .map(|q| QuestionWithOptions {
                question: q.clone(),
                options: data
                    .options
                    .values()
                    .filter(|o| o.question_id == q.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn find_question(&self, id: i64) -> AppResult<Option<QuizQuestion>> {
        Ok(self.data.lock().await.questions.get(&id).cloned())
    }

    async fn find_option(&self, id: i64) -> AppResult<Option<QuizOption>> {
        Ok(self.data.lock().await.options.get(&id).cloned())
    }

    async fn import_questions(&self, quiz_id: i64, questions: &[NewQuestion]) -> AppResult<usize> {
        let mut data = self.data.lock().await;
        for new_question in questions {
            let question = QuizQuestion {
                id: data.id(),
                quiz_id,
                question: new_question.question.clone(),
                created_at: Utc::now(),
            };
            for new_option in &new_question.options {
                let option = QuizOption {
                    id: data.id(),
                    question_id: question.id,
                    option_text: new_option.option_text.clone(),
                    is_correct: new_option.is_correct,
                };
                data.options.insert(option.id, option);
            }
            data.questions.insert(question.id, question);
        }
        Ok(questions.len())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryStore {
    async fn start(
        &self,
        quiz_id: i64,
        user_id: i64,
        max_attempts: i32,
        started_at: DateTime<Utc>,
    ) -> AppResult<QuizAttempt> {
        let mut data = self.data.lock().await;
        let mine: Vec<&QuizAttempt> = data
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id)
            .collect();

        if mine.len() as i64 >= i64::from(max_attempts) {
            return Err(AppError::Conflict("maximum attempts reached".to_string()));
        }
        if mine.iter().any(|a| a.ended_at.is_none()) {
            return Err(AppError::Conflict("an active attempt already exists".to_string()));
        }

        let attempt = QuizAttempt {
            id: data.id(),
            quiz_id,
            user_id,
            started_at,
            ended_at: None,
        };
        data.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<QuizAttempt>> {
        Ok(self.data.lock().await.attempts.get(&id).cloned())
    }

    async fn find_active(&self, quiz_id: i64, user_id: i64) -> AppResult<Option<QuizAttempt>> {
        let data = self.data.lock().await;
        Ok(data
            .attempts
            .values()
            .find(|a| a.quiz_id == quiz_id && a.user_id == user_id && a.ended_at.is_none())
            .cloned())
    }

    async fn list_for_user(&self, quiz_id: i64, user_id: i64) -> AppResult<Vec<QuizAttempt>> {
        let data = self.data.lock().await;
        let mut attempts: Vec<QuizAttempt> = data
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| std::cmp::Reverse((a.started_at, a.id)));
        Ok(attempts)
    }

    async fn save_draft(
        &self,
        attempt_id: i64,
        question_id: i64,
        selected_option_id: i64,
        saved_at: DateTime<Utc>,
    ) -> AppResult<QuizTempSubmission> {
        let mut data = self.data.lock().await;
        let attempt = data
            .attempts
            .get(&attempt_id)
            .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))?;
        if attempt.ended_at.is_some() {
            return Err(AppError::Conflict("attempt already submitted".to_string()));
        }

        let id = data.id();
        let draft = data
            .drafts
            .entry((attempt_id, question_id))
            .and_modify(|d| {
                d.selected_option_id = selected_option_id;
                d.version += 1;
                d.updated_at = saved_at;
            })
            .or_insert(QuizTempSubmission {
                id,
                attempt_id,
                question_id,
                selected_option_id,
                version: 1,
                updated_at: saved_at,
            });
        Ok(draft.clone())
    }

    async fn drafts(&self, attempt_id: i64) -> AppResult<Vec<QuizTempSubmission>> {
        let data = self.data.lock().await;
        Ok(data
            .drafts
            .values()
            .filter(|d| d.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn submissions(&self, attempt_id: i64) -> AppResult<Vec<QuizSubmission>> {
        let data = self.data.lock().await;
        Ok(data
            .submissions
            .iter()
            .filter(|s| s.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn finalize(
        &self,
        attempt_id: i64,
        ended_at: DateTime<Utc>,
        scorer: Scorer,
    ) -> AppResult<QuizResult> {
        let mut data = self.data.lock().await;
        let attempt = data
            .attempts
            .get(&attempt_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))?;
        if attempt.ended_at.is_some() {
            return Err(AppError::Conflict("attempt already submitted".to_string()));
        }

        let drafts: Vec<QuizTempSubmission> = data
            .drafts
            .values()
            .filter(|d| d.attempt_id == attempt_id)
            .cloned()
            .collect();
        if drafts.is_empty() {
            return Err(AppError::EmptySubmission);
        }

        let answer_key: AnswerKey = drafts
            .iter()
            .filter_map(|d| data.options.get(&d.selected_option_id))
            .map(|o| (o.id, o.is_correct))
            .collect();
        let card = scorer(&drafts, &answer_key);

        for answer in &card.answers {
            let id = data.id();
            data.submissions.push(QuizSubmission {
                id,
                attempt_id,
                question_id: answer.question_id,
                selected_option_id: answer.selected_option_id,
                score: answer.score,
            });
        }

        let result = QuizResult {
            id: data.id(),
            attempt_id: Some(attempt_id),
            quiz_id: attempt.quiz_id,
            user_id: attempt.user_id,
            total_questions: card.total_questions,
            correct_answers: card.correct_answers,
            wrong_answers: card.wrong_answers,
            score_percent: card.score_percent,
            created_at: ended_at,
        };
        data.results.push(result.clone());

        if let Some(stored) = data.attempts.get_mut(&attempt_id) {
            stored.ended_at = Some(ended_at);
        }
        data.drafts.retain(|(a, _), _| *a != attempt_id);

        Ok(result)
    }

    async fn find_result(&self, attempt_id: i64) -> AppResult<Option<QuizResult>> {
        let data = self.data.lock().await;
        Ok(data
            .results
            .iter()
            .find(|r| r.attempt_id == Some(attempt_id))
            .cloned())
    }
}

#[async_trait]
impl MeetingDirectory for InMemoryStore {
    async fn is_meeting_owned_by_teacher(&self, teacher_id: i64, meeting_id: i64) -> AppResult<bool> {
        let data = self.data.lock().await;
        let Some((batch_id, _)) = data.meetings.get(&meeting_id) else {
            return Ok(false);
        };
        Ok(data
            .meetings
            .values()
            .any(|(b, t)| b == batch_id && *t == teacher_id))
    }

    async fn batch_for_meeting(&self, meeting_id: i64) -> AppResult<Option<i64>> {
        Ok(self.data.lock().await.meetings.get(&meeting_id).map(|(b, _)| *b))
    }
}

#[async_trait]
impl PurchaseLedger for InMemoryStore {
    async fn has_paid(&self, user_id: i64, batch_id: i64) -> AppResult<bool> {
        Ok(self.data.lock().await.paid.contains(&(user_id, batch_id)))
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        server_port: 0,
        database_max_connections: 1,
        cors_origins: vec!["http://localhost:3000".to_string()],
    }
}

/// Spawns the app on a random port, backed by `store`.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
pub async fn spawn_app(store: &InMemoryStore) -> String {
    let shared = Arc::new(store.clone());
    let state = AppState::new(
        test_config(),
        shared.clone(),
        shared.clone(),
        shared.clone(),
        shared,
    );
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

pub fn token(user_id: i64, role: &str) -> String {
    sign_jwt(user_id, role, JWT_SECRET, 600).expect("Failed to sign test token")
}

pub const MEETING: i64 = 10;
pub const BATCH: i64 = 100;
pub const TEACHER: i64 = 1;
pub const OTHER_TEACHER: i64 = 2;
pub const STUDENT: i64 = 50;
pub const OTHER_STUDENT: i64 = 51;
pub const UNPAID_STUDENT: i64 = 52;

/// A meeting taught by `TEACHER` (another batch is taught by `OTHER_TEACHER`),
/// paid for by `STUDENT` and `OTHER_STUDENT`.
pub async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.add_meeting(MEETING, BATCH, TEACHER).await;
    store.add_meeting(20, 200, OTHER_TEACHER).await;
    store.mark_paid(STUDENT, BATCH).await;
    store.mark_paid(OTHER_STUDENT, BATCH).await;
    store
}

pub fn quiz_body(max_attempts: i32, is_open: bool) -> Value {
    let now = Utc::now();
    serde_json::json!({
        "meeting_id": MEETING,
        "title": "Ownership basics",
        "description": "Week 3",
        "quiz_type": "multiple_choice",
        "is_open": is_open,
        "start_time": (now - chrono::Duration::hours(1)).to_rfc3339(),
        "end_time": (now + chrono::Duration::hours(1)).to_rfc3339(),
        "duration_minute": 30,
        "max_attempts": max_attempts,
    })
}

/// Creates a quiz as `TEACHER` and returns its id.
pub async fn create_quiz(client: &reqwest::Client, address: &str, body: &Value) -> i64 {
    let resp = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(TEACHER, "teacher"))
        .json(body)
        .send()
        .await
        .expect("Failed to create quiz");
    assert_eq!(resp.status().as_u16(), 201);
    let quiz: Value = resp.json().await.unwrap();
    quiz["id"].as_i64().unwrap()
}

/// Imports three questions whose correct answers are A, B and A, as `TEACHER`.
pub async fn import_three_questions(client: &reqwest::Client, address: &str, quiz_id: i64) {
    let resp = client
        .post(format!("{}/api/quizzes/{}/questions/import", address, quiz_id))
        .bearer_auth(token(TEACHER, "teacher"))
        .json(&serde_json::json!({
            "rows": [
                ["Who owns a moved value?", "The new binding", "The old binding", "A"],
                ["Can two mutable borrows overlap?", "Yes", "No", "B"],
                ["Is a Box heap allocated?", "Yes", "No", "a"],
            ]
        }))
        .send()
        .await
        .expect("Failed to import questions");
    assert_eq!(resp.status().as_u16(), 201);
}

/// Staff view of the questions: `(question_id, [(option_id, is_correct)])`.
pub async fn answer_key(client: &reqwest::Client, address: &str, quiz_id: i64) -> Vec<(i64, Vec<(i64, bool)>)> {
    let quiz: Value = client
        .get(format!("{}/api/quizzes/{}/questions", address, quiz_id))
        .bearer_auth(token(TEACHER, "teacher"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    quiz["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| {
            let options = q["options"]
                .as_array()
                .unwrap()
                .iter()
                .map(|o| (o["id"].as_i64().unwrap(), o["is_correct"].as_bool().unwrap()))
                .collect();
            (q["id"].as_i64().unwrap(), options)
        })
        .collect()
}
