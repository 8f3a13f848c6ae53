use crate::direction::Direction;
use crate::models::{TaskRecord, TeamworkVerification};
use crate::resources::{format_resources_text, verification_process_text, VerificationResource};

/// Prior Teamwork entries shown to the model per category
const MAX_PRIOR_ENTRIES: usize = 3;

/// Everything the prompt depends on. Building a prompt has no side effects.
pub struct PromptInput<'a> {
    pub name: &'a str,
    pub direction: Direction,
    pub resources: &'a [&'a VerificationResource],
    pub prior: Option<&'a TeamworkVerification>,
}

/// Prompt for the structured (JSON) path
pub fn build_prompt(input: &PromptInput) -> String {
    format!("{}\n\n{}", build_body(input), json_output_block(input.direction))
}

/// Same prompt, asking for free text instead of JSON
pub fn plain_text_prompt(input: &PromptInput) -> String {
    format!("{}\n\n{}", build_body(input), plain_output_block(input.direction))
}

fn build_body(input: &PromptInput) -> String {
    format!(
        r#"{role}

You should strictly follow these rules for {source} to {target} name verification:

{process}
You can reference the following verification sources:
{resources}

{rules}

Examine the {source} name "{name}" and determine the proper {target} notation following the guidelines.

{teamwork}"#,
        role = role_line(input.direction),
        source = input.direction.source_language(),
        target = input.direction.target_language(),
        process = verification_process_text(input.direction),
        resources = format_resources_text(input.resources),
        rules = special_rules(input.direction),
        name = input.name,
        teamwork = teamwork_context(input.prior),
    )
}

fn role_line(direction: Direction) -> &'static str {
    match direction {
        Direction::KoEn => "You are a Korean language name verification expert that helps evaluate proper names in Korean-English translation contexts.",
        Direction::EnKo => "You are a terminology expert following the CF Terminology Management Manual for English to Korean name verification.",
    }
}

fn special_rules(direction: Direction) -> &'static str {
    match direction {
        Direction::KoEn => {
            r#"SPECIAL RULES FOR KOREAN TO ENGLISH NAMES:
- Follow the NIKL Revised Romanization of Korean unless an official spelling exists
- All real names use hyphenation between given-name syllables by default (e.g. Kim Ji-won)
- For North Korean names with spaces between syllables, replace spaces with hyphens and lowercase the first letter of the second syllable
- Capitalize the first letter of the surname and of the given name, rest lowercase
- For idol group or stage names written in uppercase, capitalize the first letter of each word, rest lowercase
- Animal names are written without hyphens"#
        }
        Direction::EnKo => {
            r#"SPECIAL RULES FOR ENGLISH TO KOREAN NAMES:
- Transliterate following the NIKL loanword orthography, searching surname and given name separately without splitting a single name
- Distinguish real person names from character names; stage names and group names follow their own established notation
- If the spelling matches a place name, follow the place name notation for consistency
- Do not trust records created before 2019
- For real names confirmed after 08/11/2020, confirm notation through Kyonshik for NF tasks
- For non-NF projects, confirm through Hazel (phonetician)
- Record "HZ Original Notation" in the Korean target of the Termbase"#
        }
    }
}

fn teamwork_context(prior: Option<&TeamworkVerification>) -> String {
    let Some(verification) = prior else {
        return "Teamwork verification was not performed.".to_string();
    };

    if let Some(error) = &verification.error {
        return format!("TEAMWORK VERIFICATION ERROR: {}", error);
    }

    if !verification.found {
        return "TEAMWORK VERIFICATION RESULTS:\n- No previous records found in Teamwork".to_string();
    }

    let mut text = String::from("TEAMWORK VERIFICATION RESULTS:\n");
    if !verification.previous_evaluations.is_empty() {
        text.push_str("- Previous evaluations:\n");
        push_records(&mut text, &verification.previous_evaluations);
    }
    if !verification.previous_translations.is_empty() {
        text.push_str("- Previous translations:\n");
        push_records(&mut text, &verification.previous_translations);
    }
    text.push_str(&format!("- Verification status: {}", verification.status));
    text
}

fn push_records(text: &mut String, records: &[TaskRecord]) {
    for record in records.iter().take(MAX_PRIOR_ENTRIES) {
        if record.project_name.is_empty() {
            text.push_str(&format!("  * {}\n", record.title));
        } else {
            text.push_str(&format!("  * {} (project: {})\n", record.title, record.project_name));
        }
    }
}

fn json_output_block(direction: Direction) -> String {
    let ko_en_checks = match direction {
        Direction::KoEn => {
            r#"
- romanization_compliant: Whether the romanization follows NIKL rules (true/false)
- hyphenation_compliant: Whether the hyphenation follows CF guidelines (true/false)
- capitalization_compliant: Whether the capitalization follows CF guidelines (true/false)"#
        }
        Direction::EnKo => {
            r#"
- pronunciation_guide: Guide to pronunciation in Korean"#
        }
    };

    format!(
        r#"Return your evaluation as a single JSON object with the following fields:
- name: The {source} name being evaluated
- {field}: The recommended {target} notation{checks}
- rule_scores: Object with a score (0-100) for each verification step
- verification_sources: Array of sources used for verification
- reference_links: Array of links to reference materials (if any)
- termbase_entry: Object with recommended Termbase entry details
- compliant: Whether the notation is compliant with guidelines (true/false)
- overall_score: Overall verification quality score (0-100)
- recommendations: Array of recommendations for improvement

Format your entire response as a valid JSON object. Do not include any text outside the JSON object."#,
        source = direction.source_language(),
        target = direction.target_language(),
        field = direction.notation_field(),
        checks = ko_en_checks,
    )
}

fn plain_output_block(direction: Direction) -> String {
    format!(
        r#"Provide:
1. {target} notation: the recommended {target} notation for this name
2. Verification process: the sources checked, as a bulleted list
3. Compliance score: a number from 0 to 100
4. Recommendations: a bulleted list
5. Sources: a bulleted list of references consulted"#,
        target = direction.target_language(),
    )
}
