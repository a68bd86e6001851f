use serde::{Deserialize, Deserializer, Serialize};

use super::repo_types::{DeletedTask, Task};

/// A field of a partial update.
///
/// Use with `#[serde(default)]`: an absent key stays `Missing`, an explicit
/// `null` becomes `Null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Missing,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Missing
    }
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Patch::Missing)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub completed: Patch<bool>,
}

#[derive(Debug, Serialize)]
pub struct TaskEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: Task,
}

#[derive(Debug, Serialize)]
pub struct TaskListEnvelope {
    pub success: bool,
    pub message: &'static str,
    pub count: usize,
    pub data: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct DeletedEnvelope {
    pub success: bool,
    pub message: &'static str,
    pub data: DeletedTask,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_absent_null_and_value() {
        let req: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.title, Patch::Missing);
        assert_eq!(req.completed, Patch::Missing);

        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"title": null, "completed": false}"#).unwrap();
        assert_eq!(req.title, Patch::Null);
        // false is a value, not "not provided"
        assert_eq!(req.completed, Patch::Value(false));

        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert_eq!(req.title, Patch::Value(String::new()));
    }

    #[test]
    fn patch_rejects_wrong_types() {
        assert!(serde_json::from_str::<UpdateTaskRequest>(r#"{"completed": "yes"}"#).is_err());
    }

    #[test]
    fn create_request_defaults() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"title": "buy milk"}"#).unwrap();
        assert_eq!(req.title, "buy milk");
        assert!(!req.completed);
    }
}
