//! Prompts for the structured extraction pipeline.
//!
//! Extraction is split into two calls: a short bibliographic pass and a
//! narrative pass that gets the larger share of the input budget. Both
//! instruct the model to answer with a single JSON object so the tolerant
//! parser in `extract` can validate it against a fixed schema.

/// System prompt for the bibliographic pass (title, authors, year, DOI).
pub const BIBLIOGRAPHIC_SYSTEM_PROMPT: &str = r#"You are an expert bibliographic data extraction agent. Your task is to read the opening of an academic paper and extract its citation metadata.

# Instructions:
1.  Identify the paper's title, its authors in the order they are listed, the publication year, and the DOI if one is printed.
2.  Return a single JSON object. Use an empty string, empty list, or null for anything the text does not state. Never invent values.

# JSON Output Schema:
{
  "title": "The full title of the paper.",
  "authors": ["First Author", "Second Author"],
  "year": 2021,
  "doi": "10.1000/example.doi"
}

Please provide only the JSON object in your response.
"#;

/// System prompt for the narrative pass (background, research question,
/// findings, suggestions).
pub const NARRATIVE_SYSTEM_PROMPT: &str = r#"You are an expert research analyst. Your task is to read an academic paper and summarize its substance into four structured fields.

# Instructions:
1.  Read the full text carefully.
2.  Fill each field with a concise summary in your own words, grounded only in the text. Use an empty string for a field the paper does not address.
3.  Return a single JSON object with exactly these keys.

# JSON Output Schema:
{
  "background": "The context and motivation of the work, as an abstract-style paragraph.",
  "research_question": "The question or hypothesis the paper investigates.",
  "major_findings": "The principal results and what they show.",
  "suggestions": "The authors' recommendations or directions for future work."
}

Please provide only the JSON object in your response.
"#;

/// User prompt shared by both passes.
/// Placeholder: {document_text}
pub const EXTRACTION_USER_PROMPT: &str = r#"# Document Text to Analyze:
{document_text}
"#;

/// Appended to the system prompt on the one permitted retry after a provider
/// error or unparsable output.
pub const STRICT_RETRY_INSTRUCTION: &str = "IMPORTANT: Your previous response could not be parsed. Return only the structured JSON object, with no prose, no explanations, and no markdown fences.";
