use super::schema::ResultEvent;

/// Text of the system line shown when a turn ends in failure.
///
/// Known subtypes map to fixed messages; anything else prefers the detail
/// the agent attached to the result.
pub fn turn_error_message(result: &ResultEvent) -> String {
    match result.subtype.as_str() {
        "error_max_turns" => "Reached the maximum number of turns for this request.".to_string(),
        "error_during_execution" => "The agent stopped because of an error during execution.".to_string(),
        "error_max_budget_usd" => "Reached the maximum budget for this request.".to_string(),
        "error_max_structured_output_retries" => {
            "Could not produce valid structured output within the retry limit.".to_string()
        }
        other => fallback_message(result, other),
    }
}

fn fallback_message(result: &ResultEvent, subtype: &str) -> String {
    let details: Vec<&str> = result
        .errors
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect();
    if !details.is_empty() {
        return details.join("\n");
    }

    if let Some(text) = result.result.as_deref().map(str::trim)
        && !text.is_empty()
    {
        return text.to_string();
    }

    format!("The agent turn failed ({}).", subtype)
}
