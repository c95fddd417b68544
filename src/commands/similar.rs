use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::chain::embeddings::{
    EmbeddingModel, HuggingFaceEmbeddings, OpenAiEmbeddings, rank_by_similarity,
};
use crate::chain::provider::Provider;
use crate::commands::resolve_provider;

#[derive(Debug, Args, Clone)]
pub struct SimilarArgs {
    /// Query to match against the documents.
    query: String,

    /// Document to search; repeatable.
    #[arg(long = "doc")]
    docs: Vec<String>,
    /// File with one document per line.
    #[arg(long)]
    docs_file: Option<PathBuf>,

    #[arg(long)]
    provider: Option<String>,
    /// Embedding model id; provider default when omitted.
    #[arg(long)]
    model: Option<String>,

    /// Emit the full ranking as JSON.
    #[arg(long)]
    json: bool,
}

pub async fn run(args: SimilarArgs) -> Result<(), String> {
    let documents = collect_documents(&args)?;
    if documents.is_empty() {
        return Err("No documents provided. Use --doc or --docs-file.".to_string());
    }

    // Embeddings default to the Hugging Face backend when nothing is
    // selected; an invalid selection still fails loudly.
    let provider = match resolve_provider(args.provider.as_deref(), None) {
        Ok(provider) => provider,
        Err(message) if message.starts_with("No provider") => Provider::HuggingFace,
        Err(message) => return Err(message),
    };
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| provider.default_embedding_model().to_string());

    let (doc_vectors, query_vector) = match provider {
        Provider::HuggingFace => {
            let client = HuggingFaceEmbeddings::new(model).map_err(|err| err.to_string())?;
            embed_corpus(&client, &documents, &args.query).await?
        }
        Provider::Openai => {
            let client = OpenAiEmbeddings::new(model).map_err(|err| err.to_string())?;
            embed_corpus(&client, &documents, &args.query).await?
        }
    };

    let ranked = rank_by_similarity(&query_vector, &doc_vectors);
    let (best_index, best_score) = ranked[0];

    if args.json {
        let entries: Vec<_> = ranked
            .iter()
            .map(|(index, score)| {
                json!({
                    "index": index,
                    "score": score,
                    "document": documents[*index],
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "query": args.query,
                "ranking": entries,
            }))
            .map_err(|err| err.to_string())?
        );
    } else {
        println!("{}", args.query);
        println!("{}", documents[best_index]);
        println!("score: {best_score:.4}");
    }

    Ok(())
}

async fn embed_corpus<M: EmbeddingModel>(
    client: &M,
    documents: &[String],
    query: &str,
) -> Result<(Vec<Vec<f64>>, Vec<f64>), String> {
    let doc_vectors = client
        .embed(documents)
        .await
        .map_err(|err| err.to_string())?;
    let query_vector = client
        .embed_one(query)
        .await
        .map_err(|err| err.to_string())?;
    Ok((doc_vectors, query_vector))
}

fn collect_documents(args: &SimilarArgs) -> Result<Vec<String>, String> {
    let mut documents = args.docs.clone();
    if let Some(path) = &args.docs_file {
        let raw = fs::read_to_string(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
        documents.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    Ok(documents)
}
