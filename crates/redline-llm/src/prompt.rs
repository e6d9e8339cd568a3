//! Prompt construction for analysis, chat and negotiation.

use redline_core::{ChatTurn, CompletionRequest, Message, RedFlag, Role};

/// System prompt for the risk analysis.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are an expert strict lawyer. Your job is to review the following contract text.
Identify any clauses that are dangerous, unfair, or predatory to the user.

Specific Focus Areas:
- Financial traps (hidden fees, non-refundable deposits)
- Privacy violations (selling data)
- Unfair termination rules
- Liability waivers

Output Format:
You must return ONLY a valid JSON object. Do not add any conversational text.
Structure:
{
    "safety_score": (integer 0-100),
    "summary": "One sentence summary of the contract vibe.",
    "red_flags": [
        {
            "clause": "The exact text from the contract",
            "risk": "Why this is bad (Explain like I am 5)",
            "severity": "High" or "Medium"
        }
    ]
}"#;

/// System prompt for a single-clause negotiation email.
pub const NEGOTIATION_SYSTEM_PROMPT: &str = r#"You are a professional legal negotiator. Your goal is to write a polite, professional,
and concise email to a landlord or employer requesting an amendment to a contract.

Guidelines:
- Tone: Respectful, cooperative, but firm on the issue.
- Context: The user is worried about a specific clause.
- Output: Just the body of the email. Keep it under 200 words."#;

/// System prompt for an email covering every red flag.
pub const BULK_NEGOTIATION_SYSTEM_PROMPT: &str = r#"You are a senior legal counsel acting on behalf of a client.
Your goal is to draft a formal, comprehensive negotiation email to a counterparty (Landlord/Employer).

Instructions:
1. Tone: Professional, firm, yet constructive. Use legal terminology where appropriate but keep it clear.
2. Structure:
   - Opening: Acknowledge receipt of the contract.
   - Body: systematically address the concerns listed below. Group them logically if possible.
   - Closing: Request a revised version of the agreement.
3. Constraint: Do not be aggressive. The goal is to sign the deal, but with better terms."#;

/// System prompt for follow-up questions about a reviewed contract.
pub const CHAT_SYSTEM_PROMPT: &str = r#"You are a helpful legal assistant answering questions about a contract the user has uploaded.
Answer using only the contract excerpts provided with the question. If the excerpts do not
contain the answer, say so plainly instead of guessing. Keep answers short and in plain language."#;

/// Join retrieved chunks into one context block.
fn join_context(chunks: &[String]) -> String {
    chunks.join("\n\n")
}

/// Request for the structured risk analysis of retrieved chunks.
pub fn analysis_request(chunks: &[String]) -> CompletionRequest {
    CompletionRequest::new(
        ANALYSIS_SYSTEM_PROMPT,
        format!("Here is the contract text:\n\n{}", join_context(chunks)),
    )
}

/// Request for a negotiation email about one clause.
pub fn negotiation_request(clause: &str, risk: &str) -> CompletionRequest {
    CompletionRequest::new(
        NEGOTIATION_SYSTEM_PROMPT,
        format!(
            "Please draft an email regarding this clause: '{}'. \nMy concern is: {}",
            clause, risk
        ),
    )
}

/// Request for one email covering every red flag, in order.
pub fn bulk_negotiation_request(red_flags: &[RedFlag]) -> CompletionRequest {
    let issues: String = red_flags
        .iter()
        .map(|flag| format!("- Clause: '{}'\n  Concern: {}\n\n", flag.clause, flag.risk))
        .collect();

    CompletionRequest::new(
        BULK_NEGOTIATION_SYSTEM_PROMPT,
        format!(
            "Please draft a comprehensive negotiation email addressing these specific issues:\n\n{}",
            issues
        ),
    )
}

/// Request answering `question` from `context`, after the prior turns.
///
/// History roles are mapped with [`Role::from_history`]; the excerpts ride
/// along with the final user message.
pub fn chat_request(context: &[String], question: &str, history: &[ChatTurn]) -> CompletionRequest {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(CHAT_SYSTEM_PROMPT));

    for turn in history {
        messages.push(Message {
            role: Role::from_history(&turn.role),
            content: turn.content.clone(),
        });
    }

    let excerpts = if context.is_empty() {
        "(no excerpts found for this document)".to_string()
    } else {
        join_context(context)
    };
    messages.push(Message::user(format!(
        "Contract excerpts:\n\n{}\n\nQuestion: {}",
        excerpts, question
    )));

    CompletionRequest {
        messages,
        temperature: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::Severity;

    #[test]
    fn test_analysis_request() {
        let request = analysis_request(&["chunk one".to_string(), "chunk two".to_string()]);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("safety_score"));
        assert_eq!(
            request.last_user_message(),
            Some("Here is the contract text:\n\nchunk one\n\nchunk two")
        );
    }

    #[test]
    fn test_negotiation_request() {
        let request = negotiation_request("No refunds", "You lose money");
        let user = request.last_user_message().unwrap();
        assert!(user.contains("'No refunds'"));
        assert!(user.contains("My concern is: You lose money"));
    }

    #[test]
    fn test_bulk_negotiation_lists_every_flag() {
        let flags = vec![
            RedFlag::new("Clause A", "Risk A", Severity::High),
            RedFlag::new("Clause B", "Risk B", Severity::Medium),
        ];
        let request = bulk_negotiation_request(&flags);
        let user = request.last_user_message().unwrap();
        assert!(user.contains("- Clause: 'Clause A'\n  Concern: Risk A\n\n"));
        assert!(user.contains("- Clause: 'Clause B'\n  Concern: Risk B\n\n"));
        assert!(user.find("Clause A").unwrap() < user.find("Clause B").unwrap());
    }

    #[test]
    fn test_chat_request_passes_history_through() {
        let history = vec![
            ChatTurn::new("user", "Is there a deposit?"),
            ChatTurn::new("bot", "Yes, two months of rent."),
        ];
        let request = chat_request(&["Deposit is two months.".to_string()], "Is it refundable?", &history);

        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(request.messages[2].content, "Yes, two months of rent.");

        let user = request.last_user_message().unwrap();
        assert!(user.contains("Deposit is two months."));
        assert!(user.ends_with("Question: Is it refundable?"));
    }

    #[test]
    fn test_chat_request_without_context() {
        let request = chat_request(&[], "Anything?", &[]);
        assert_eq!(request.messages.len(), 2);
        assert!(request
            .last_user_message()
            .unwrap()
            .contains("no excerpts found"));
    }
}
