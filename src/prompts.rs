//! Prompts for LLM-based invoice-to-XML extraction.
//!
//! Every prompt lives here so the generator in [`crate::pipeline::llm`]
//! carries no prompt text of its own. Callers can override the system prompt
//! via [`crate::config::ConversionConfig::system_prompt`]; the user prompt is
//! always built by [`invoice_prompt`].

/// Default system prompt: casts the model as a Pohoda accounting/XML expert.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Jsi expert na účetní systémy a XML importy do programu Pohoda.";

/// Instruction placed before the extracted invoice text.
///
/// Asks for an `issuedInvoice` document importable into Pohoda, returned as
/// bare XML without commentary or Markdown.
pub const INVOICE_INSTRUCTION: &str = "Z následujícího textu účetního dokladu vytěž data a vygeneruj XML soubor vhodný pro import do účetnictví Pohoda (typ: issuedInvoice). Uveď pouze výsledný XML bez komentáře ani formátovacích prvků Markdown:";

/// Build the user message for one invoice.
pub fn invoice_prompt(text: &str) -> String {
    format!("\n{INVOICE_INSTRUCTION}\n\n{text}\n")
}
