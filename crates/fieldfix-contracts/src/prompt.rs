use crate::problem::{Domain, ImageAttachment, Language, ProblemRequest};

/// User-turn content of a solve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPayload {
    Text(String),
    Multipart {
        text: String,
        image: ImageAttachment,
    },
}

impl ContentPayload {
    pub fn text(&self) -> &str {
        match self {
            ContentPayload::Text(text) => text,
            ContentPayload::Multipart { text, .. } => text,
        }
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        match self {
            ContentPayload::Text(_) => None,
            ContentPayload::Multipart { image, .. } => Some(image),
        }
    }
}

const OPERATING_RULES: [&str; 8] = [
    "Always answer as a field engineer: technical, specific, no generic advice.",
    "Always include projectScopeConfirm restating the job scope and what is excluded.",
    "Always include timeToComplete with a realistic duration estimate.",
    "Always include both followUp24h and followUp7d checklists.",
    "Include safetyCheck with the concrete hazard and isolation step whenever the problem mentions or implies voltage, pressure, heat, height, load, fumes or chemicals; otherwise set it to \"None\".",
    "If the description is vague or missing key readings, ask up to three clarificationQuestions before committing to a root cause.",
    "Diagnose in hypothesis/test pairs: each diagnosticTree entry states one hypothesis and the measurement or inspection that confirms or rules it out.",
    "Keep a professional operational tone suitable for a work order.",
];

const SOLVE_RESPONSE_SHAPE: &str = r#"{
  "analysis": "string, root-cause analysis",
  "safetyCheck": "string, hazard and isolation step, or \"None\"",
  "diagnosticTree": [{"hypothesis": "string", "test": "string"}],
  "clarificationQuestions": ["string"],
  "projectScopeConfirm": "string",
  "timeToComplete": "string",
  "followUp24h": ["string"],
  "followUp7d": ["string"],
  "steps": ["string, ordered remediation step"],
  "variables": {"Variable name with unit": "value"},
  "finalResult": "string, expected outcome once the steps are done",
  "confidence": 0.0
}"#;

fn language_directive(language: Language) -> String {
    match language {
        Language::En => "Respond in English.".to_string(),
        Language::Sw => "Respond in Swahili (Kiswahili). Every string value in the JSON must be \
written in Swahili; keep JSON keys, units and part numbers unchanged."
            .to_string(),
    }
}

/// System instruction for the solve call.
pub fn solve_system_instruction(domain: Domain, language: Language) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(&language_directive(language));
    out.push_str("\n\n");
    out.push_str(&format!(
        "You are a senior {domain} engineering troubleshooting assistant working alongside \
technicians on site.\n\nOperating rules:\n"
    ));
    for (idx, rule) in OPERATING_RULES.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", idx + 1, rule));
    }
    out.push_str(
        "\nReturn ONLY a JSON object with this shape (no markdown, no prose). \
`steps`, `variables`, `confidence` and `analysis` are required; `confidence` is a number \
between 0.0 and 1.0; every value in `variables` is a string.\n",
    );
    out.push_str(SOLVE_RESPONSE_SHAPE);
    out
}

/// Content for the solve call: `"{domain}: {description}"`, plus the image when one is attached.
pub fn solve_content(request: &ProblemRequest) -> ContentPayload {
    let text = format!("{}: {}", request.domain, request.description);
    match request.image.as_ref() {
        Some(image) => ContentPayload::Multipart {
            text,
            image: image.clone(),
        },
        None => ContentPayload::Text(text),
    }
}

/// Prompt for the bill-of-materials call, mined from an existing analysis.
pub fn bom_prompt(analysis: &str, language: Language) -> String {
    format!(
        "Extract the bill of materials needed to carry out the repair described in the analysis \
below.\n\
Return ONLY a JSON object: {{\"bom\": [{{\"itemName\": \"string\", \"specification\": \"string\", \
\"quantity\": \"string\", \"priority\": \"High\" | \"Medium\" | \"Low\"}}]}}.\n\
List items in the order they are needed. `priority` must be exactly High, Medium or Low.\n\
Write itemName, specification and quantity in {} ({}); keep the priority values in English.\n\n\
ANALYSIS:\n{}",
        language.display_name(),
        language.code(),
        analysis.trim()
    )
}
