//! Pipeline stages for PDF-to-Pohoda conversion.
//!
//! Each submodule implements one step and exposes it behind a small trait,
//! so the batch driver can be exercised with in-memory fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ postprocess ──▶ (write) ──▶ validate ──▶ submit
//! (path)    (pdfium)   (chat)   (fences)                   (optional)   (optional)
//! ```
//!
//! 1. [`input`] resolve the user-supplied path into a list of PDFs
//! 2. [`extract`] pull the text layer out of each page via pdfium
//! 3. [`llm`] ask the chat model for Pohoda `issuedInvoice` XML
//! 4. [`postprocess`] strip a Markdown fence the model may add anyway
//! 5. [`validate`] content-model check against the XSD
//! 6. [`submit`] POST to the Pohoda mServer

pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod submit;
pub mod validate;
