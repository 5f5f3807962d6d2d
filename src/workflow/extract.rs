/// Response Text Extraction
///
/// The run endpoint answers with a deeply nested document. Only one value in
/// it matters: `outputs[0].outputs[0].results.message.text`. The walk below is
/// positional and fail-fast; each step reports the segment it expected.

use serde_json::{Map, Value};

use super::error::WorkflowError;

const OUTPUTS: &str = "outputs";
const OUTPUT: &str = "outputs[0]";
const INNER_OUTPUTS: &str = "outputs[0].outputs";
const INNER_OUTPUT: &str = "outputs[0].outputs[0]";
const RESULTS: &str = "outputs[0].outputs[0].results";
const MESSAGE: &str = "outputs[0].outputs[0].results.message";
const TEXT: &str = "outputs[0].outputs[0].results.message.text";

/// Pull the reply text out of a raw run response body.
///
/// The text is returned exactly as sent, without trimming.
pub fn extract_text(body: &[u8]) -> Result<String, WorkflowError> {
    let document: Map<String, Value> =
        serde_json::from_slice(body).map_err(WorkflowError::MalformedJson)?;

    let output = first_object(&document, "outputs", OUTPUTS, OUTPUT)?;
    let inner = first_object(output, "outputs", INNER_OUTPUTS, INNER_OUTPUT)?;

    let results = object_field(inner, "results", RESULTS)?;
    let message = object_field(results, "message", MESSAGE)?;

    message
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(WorkflowError::MissingField(TEXT))
}

/// First element of the non-empty array at `key`, which must be an object.
fn first_object<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    array_path: &'static str,
    element_path: &'static str,
) -> Result<&'a Map<String, Value>, WorkflowError> {
    let first = parent
        .get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .ok_or(WorkflowError::MissingField(array_path))?;

    first
        .as_object()
        .ok_or(WorkflowError::ShapeMismatch(element_path))
}

fn object_field<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    path: &'static str,
) -> Result<&'a Map<String, Value>, WorkflowError> {
    parent
        .get(key)
        .and_then(Value::as_object)
        .ok_or(WorkflowError::MissingField(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document_with_text(text: &str) -> Vec<u8> {
        json!({
            "session_id": "abc",
            "outputs": [{
                "inputs": {"input_value": "ping"},
                "outputs": [{
                    "results": {"message": {"text": text, "sender": "Machine"}},
                    "artifacts": {}
                }]
            }]
        })
        .to_string()
        .into_bytes()
    }

    fn extract(value: Value) -> Result<String, WorkflowError> {
        extract_text(value.to_string().as_bytes())
    }

    #[test]
    fn returns_pong_from_full_document() {
        let body = br#"{"outputs":[{"outputs":[{"results":{"message":{"text":"pong"}}}]}]}"#;
        assert_eq!(extract_text(body).unwrap(), "pong");
    }

    #[test]
    fn text_is_returned_unaltered() {
        for text in ["hello", "", "  padded \n", "quote \" and \\ and {}", "ünïcødé ✓"] {
            assert_eq!(extract_text(&document_with_text(text)).unwrap(), text);
        }
    }

    #[test]
    fn rejects_invalid_json() {
        let err = extract_text(b"internal error").unwrap_err();
        assert!(matches!(err, WorkflowError::MalformedJson(_)));
    }

    #[test]
    fn rejects_non_object_document() {
        let err = extract(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, WorkflowError::MalformedJson(_)));
    }

    #[test]
    fn missing_outputs() {
        let err = extract(json!({"result": "x"})).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("outputs")));
    }

    #[test]
    fn empty_outputs_counts_as_missing() {
        let err = extract(json!({"outputs": []})).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("outputs")));
    }

    #[test]
    fn outputs_of_wrong_type_counts_as_missing() {
        let err = extract(json!({"outputs": {"0": {}}})).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("outputs")));
    }

    #[test]
    fn first_output_not_an_object() {
        let err = extract(json!({"outputs": ["text"]})).unwrap_err();
        assert!(matches!(err, WorkflowError::ShapeMismatch("outputs[0]")));
    }

    #[test]
    fn missing_inner_outputs() {
        let err = extract(json!({"outputs": [{"outputs": []}]})).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("outputs[0].outputs")));
    }

    #[test]
    fn inner_output_not_an_object() {
        let err = extract(json!({"outputs": [{"outputs": [null]}]})).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::ShapeMismatch("outputs[0].outputs[0]")
        ));
    }

    #[test]
    fn missing_results() {
        let err = extract(json!({"outputs": [{"outputs": [{"results": "none"}]}]})).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MissingField("outputs[0].outputs[0].results")
        ));
    }

    #[test]
    fn missing_message() {
        let err = extract(json!({"outputs": [{"outputs": [{"results": {}}]}]})).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MissingField("outputs[0].outputs[0].results.message")
        ));
    }

    #[test]
    fn non_string_text() {
        let doc = json!({"outputs": [{"outputs": [{"results": {"message": {"text": 42}}}]}]});
        let err = extract(doc).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MissingField("outputs[0].outputs[0].results.message.text")
        ));
    }

    #[test]
    fn only_first_branch_is_consulted() {
        let doc = json!({
            "outputs": [
                {"outputs": [{"results": {}}, {"results": {"message": {"text": "second"}}}]},
                {"outputs": [{"results": {"message": {"text": "other"}}}]}
            ]
        });
        let err = extract(doc).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MissingField("outputs[0].outputs[0].results.message")
        ));
    }
}
