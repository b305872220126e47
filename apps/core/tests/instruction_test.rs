use sundar_core::instruction::{extract, strip, Instruction};

#[test]
fn terminal_instruction_is_extracted_and_stripped() {
    let reply = r#"Certainly. I will list the directory for you.
{"command_type": "terminal", "command": "ls -la", "description": "List files"}
Is there anything else?"#;

    let found = extract(reply).unwrap();
    assert_eq!(
        found.instruction,
        Instruction::Terminal {
            command: "ls -la".to_string(),
            description: Some("List files".to_string()),
        }
    );
    assert_eq!(
        strip(reply, &found.span),
        "Certainly. I will list the directory for you.\nIs there anything else?"
    );
}

#[test]
fn fenced_instruction_removes_fence_too() {
    let reply = "Clearing now.\n```json\n{\"command_type\": \"system\", \"action\": \"clear\", \"parameters\": {}}\n```";
    let found = extract(reply).unwrap();
    assert!(matches!(found.instruction, Instruction::System { ref action, .. } if action == "clear"));
    assert_eq!(strip(reply, &found.span), "Clearing now.");
}

#[test]
fn lenient_json_is_accepted() {
    let reply = "Done. {command_type: 'terminal', command: 'uptime',}";
    let found = extract(reply).unwrap();
    assert_eq!(
        found.instruction,
        Instruction::Terminal {
            command: "uptime".to_string(),
            description: None,
        }
    );
}

#[test]
fn prose_without_objects_has_no_instruction() {
    assert!(extract("Good afternoon. Everything is running smoothly.").is_none());
}

#[test]
fn unrelated_objects_are_ignored() {
    let reply = r#"Here is some data {"mood": "calm"} and nothing else."#;
    assert!(extract(reply).is_none());
}

#[test]
fn two_instructions_are_ambiguous() {
    let reply = r#"{"command_type":"terminal","command":"ls"} and {"command_type":"terminal","command":"pwd"}"#;
    assert!(extract(reply).is_none());
}

#[test]
fn unbalanced_braces_fail_safe() {
    let reply = r#"{"command_type":"terminal","command":"ls"} then { oops"#;
    assert!(extract(reply).is_none());
}

#[test]
fn empty_command_or_unknown_type_is_absent() {
    assert!(extract(r#"{"command_type":"terminal","command":"  "}"#).is_none());
    assert!(extract(r#"{"command_type":"rocket","command":"launch"}"#).is_none());
    assert!(extract(r#"{"command":"ls"}"#).is_none());
}

#[test]
fn instruction_only_reply_strips_to_empty() {
    let reply = r#"  {"command_type":"system","action":"help"}  "#;
    let found = extract(reply).unwrap();
    assert_eq!(strip(reply, &found.span), "");
}
