//! Upload, list and remove documents

use crate::documents::{ChunkStore, Document, IngestOptions};
use crate::error::{Error, Result};
use crate::extract::extract_file;
use crate::progress::add_spinner;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub document_id: String,
    pub filename: String,
    pub characters: usize,
}

/// Extract text from `path` and index it as a new document
pub async fn cmd_upload(
    chunks: &ChunkStore,
    path: &Path,
    options: IngestOptions,
) -> Result<UploadReport> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::InvalidArgument(format!("not a file: {}", path.display())))?
        .to_string();

    let text = extract_file(path)?;

    let spinner = add_spinner(format!("Indexing {}", filename));
    let result = chunks.ingest(&text, &filename, options).await;
    spinner.finish_and_clear();

    Ok(UploadReport {
        document_id: result?.to_string(),
        filename,
        characters: text.chars().count(),
    })
}

pub async fn cmd_list_documents(chunks: &ChunkStore) -> Result<Vec<Document>> {
    chunks.list_documents().await
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveReport {
    pub documents: usize,
    pub chunks_deleted: usize,
}

/// Delete documents by id; quizzes that reference them are left alone
pub async fn cmd_remove_documents(
    chunks: &ChunkStore,
    document_ids: &[String],
) -> Result<RemoveReport> {
    let chunks_deleted = chunks.delete_documents(document_ids).await?;
    Ok(RemoveReport {
        documents: document_ids.len(),
        chunks_deleted,
    })
}

pub fn print_upload_report(report: &UploadReport) {
    println!("✓ Uploaded {}", report.filename);
    println!("  Document ID: {}", report.document_id);
    println!("  Characters: {}", report.characters);
}

pub fn print_documents(documents: &[Document]) {
    println!("\n📚 Documents\n");

    if documents.is_empty() {
        println!("No documents uploaded. Use 'quizzer upload <file>' to add one.");
        return;
    }

    for doc in documents {
        println!("• {}", doc.filename);
        println!("  ID: {}", doc.id);
        println!("  Uploaded: {}", doc.upload_timestamp);
        println!("  Characters: {}", doc.full_text.chars().count());
    }
}

pub fn print_remove_report(report: &RemoveReport) {
    println!(
        "✓ Removed {} document(s), {} chunk(s) deleted",
        report.documents, report.chunks_deleted
    );
}
