//! Fixed interviewer script: everything spoken verbatim to the candidate plus
//! the instruction turns handed to the response generator.

pub fn introduction(job_role: &str) -> String {
    format!(
        "Hello! Thank you for taking the time to speak with us. This is an automated \
         screening interview for the {job_role} position. I will ask you two technical \
         questions, and afterwards you can ask questions of your own. After each tone, \
         please give your answer, then stay silent once you are done. Let's start with a \
         short introduction: please tell me about yourself and your relevant experience."
    )
}

pub fn qna_invitation(finish_on_key: &str) -> String {
    format!(
        "Thank you, that covers the technical questions. Now it's your turn: do you have \
         any questions about the role or the company? Ask after the tone, or press \
         {finish_on_key} to finish the interview."
    )
}

pub fn qna_reinvitation(finish_on_key: &str) -> String {
    format!("Do you have any other questions? Ask after the tone, or press {finish_on_key} to finish.")
}

pub const CLOSING_REMARK: &str = "That wraps up our interview. Thank you for your time, \
     we will get back to you with the results soon. Goodbye!";

pub const APOLOGY: &str = "I'm sorry, we ran into a technical problem on our side and \
     cannot continue the interview right now. We will reach out to reschedule. Goodbye.";

pub const FIRST_QUESTION_INSTRUCTION: &str = "Ask the candidate the first technical \
     screening question for this role. Ask exactly one question and keep it under three sentences.";

pub const SECOND_QUESTION_INSTRUCTION: &str = "Ask the candidate a second technical \
     screening question for this role, covering a different area than the first. Ask \
     exactly one question and keep it under three sentences.";

pub const REPEAT_REQUEST_INSTRUCTION: &str = "The candidate's last question could not be \
     heard. Apologize briefly and ask them to repeat the question.";

pub fn answer_instruction(question: &str) -> String {
    format!(
        "The candidate asked: \"{question}\". Answer it honestly and concisely, in at \
         most three sentences, speaking as the interviewer."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_introduction_mentions_role() {
        let text = introduction("Backend Engineer");
        assert!(text.contains("Backend Engineer"));
        assert!(text.contains("tell me about yourself"));
    }

    #[test]
    fn test_invitations_mention_finish_key() {
        assert!(qna_invitation("#").contains("press # to finish"));
        assert!(qna_reinvitation("9").contains("press 9 to finish"));
    }

    #[test]
    fn test_answer_instruction_embeds_question() {
        let text = answer_instruction("What is the team size?");
        assert!(text.contains("What is the team size?"));
    }
}
