//! Declarative registry of document-bearing locations.
//!
//! Both the resolver and the consolidator drive their walks off these
//! tables, so the two stay in lock-step by construction: adding a document
//! type or a nested section is a data edit here, not new control flow.

/// Main document types: locator key in the flat `documents` map paired with
/// the top-level field that receives extracted text.
pub const MAIN_DOCUMENTS: &[(&str, &str)] = &[
    ("transcript", "transcript_content"),
    ("sop", "sop_content"),
    ("resume", "resume_content"),
    ("lor_academic", "lor_academic_content"),
    ("lor_research", "lor_research_content"),
    ("lor_professional", "lor_professional_content"),
    ("passport", "passport_content"),
    ("gre_report", "gre_report_content"),
    ("english_report", "english_report_content"),
    ("degree_certificate", "degree_certificate_content"),
    ("bank_statement", "bank_statement_content"),
    ("affidavit", "affidavit_content"),
    ("fee_receipt", "fee_receipt_content"),
    ("writing_sample", "writing_sample_content"),
    ("portfolio", "portfolio_content"),
    ("research_proposal", "research_proposal_content"),
    ("publication_certificate", "publication_certificate_content"),
    ("internship_certificate", "internship_certificate_content"),
    ("work_certificate", "work_certificate_content"),
    (
        "recommendation_letter_additional",
        "recommendation_letter_additional_content",
    ),
];

/// Whether a nested location is a single sub-object or an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Singular,
    List,
}

/// One document slot inside a nested section's sub-object.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSlot {
    /// Field holding the source locator.
    pub document_field: &'static str,
    /// Field that receives the extracted text.
    pub content_field: &'static str,
}

/// A nested document-bearing location within the application record.
#[derive(Debug, Clone, Copy)]
pub struct NestedSection {
    /// Stable logical name carried on write-back addresses.
    pub name: &'static str,
    /// Record path to the container (the sub-object or the list itself).
    pub path: &'static [&'static str],
    pub kind: SectionKind,
    pub slots: &'static [DocumentSlot],
}

pub const NESTED_SECTIONS: &[NestedSection] = &[
    NestedSection {
        name: "personal_information",
        path: &["personal_information"],
        kind: SectionKind::Singular,
        slots: &[DocumentSlot {
            document_field: "government_id_document",
            content_field: "government_id_content",
        }],
    },
    NestedSection {
        name: "research_experience.projects",
        path: &["research_experience", "projects"],
        kind: SectionKind::List,
        slots: &[
            DocumentSlot {
                document_field: "publication_document",
                content_field: "publication_content",
            },
            DocumentSlot {
                document_field: "report_document",
                content_field: "report_content",
            },
        ],
    },
    NestedSection {
        name: "work_experience",
        path: &["work_experience"],
        kind: SectionKind::List,
        slots: &[
            DocumentSlot {
                document_field: "certificate_document",
                content_field: "certificate_content",
            },
            DocumentSlot {
                document_field: "recommendation_document",
                content_field: "recommendation_content",
            },
        ],
    },
];

/// Look up a nested section by the name carried on a write-back address.
pub fn section_by_name(name: &str) -> Option<&'static NestedSection> {
    NESTED_SECTIONS.iter().find(|section| section.name == name)
}
