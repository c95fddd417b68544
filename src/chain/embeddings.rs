use crate::chain::provider::{Provider, ProviderError, require_api_key};

/// External capability that maps texts to fixed-length numeric vectors,
/// one per input, in input order.
pub trait EmbeddingModel {
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f64>>, ProviderError>> + Send;

    fn embed_one(&self, text: &str) -> impl Future<Output = Result<Vec<f64>, ProviderError>> + Send;
}

/// Hugging Face feature-extraction embeddings.
#[derive(Debug, Clone)]
pub struct HuggingFaceEmbeddings {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl HuggingFaceEmbeddings {
    /// Creates a client from a hub model id and the `HF_TOKEN` env var.
    pub fn new(model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = require_api_key(Provider::HuggingFace)?;
        Ok(Self::with_api_key(model, api_key))
    }

    /// Creates a client with an explicit credential, bypassing the
    /// environment.
    pub fn with_api_key(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://router.huggingface.co/hf-inference/models/{}/pipeline/feature-extraction",
            self.model
        )
    }
}

impl EmbeddingModel for HuggingFaceEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ProviderError> {
        let provider = Provider::HuggingFace;
        let payload = serde_json::json!({ "inputs": texts });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ProviderError::Request { provider, source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider,
                status,
                body,
            });
        }

        let vectors: Vec<Vec<f64>> = response
            .json()
            .await
            .map_err(|source| ProviderError::Request { provider, source })?;
        if vectors.len() != texts.len() {
            return Err(ProviderError::EmptyResponse { provider });
        }
        Ok(vectors)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f64>, ProviderError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed(&texts).await?;
        vectors.pop().ok_or(ProviderError::EmptyResponse {
            provider: Provider::HuggingFace,
        })
    }
}

/// OpenAI `/v1/embeddings` client.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f64>,
}

impl OpenAiEmbeddings {
    /// Creates a client from a model id and the `OPENAI_API_KEY` env var.
    pub fn new(model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = require_api_key(Provider::Openai)?;
        Ok(Self::with_api_key(model, api_key))
    }

    pub fn with_api_key(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl EmbeddingModel for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ProviderError> {
        let provider = Provider::Openai;
        let payload = serde_json::json!({ "model": self.model, "input": texts });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ProviderError::Request { provider, source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider,
                status,
                body,
            });
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|source| ProviderError::Request { provider, source })?;
        if body.data.len() != texts.len() {
            return Err(ProviderError::EmptyResponse { provider });
        }
        Ok(body.data.into_iter().map(|entry| entry.embedding).collect())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f64>, ProviderError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed(&texts).await?;
        vectors.pop().ok_or(ProviderError::EmptyResponse {
            provider: Provider::Openai,
        })
    }
}

/// Cosine similarity of two vectors. Returns 0.0 when either vector has
/// zero norm or the dimensions differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Ranks documents against a query vector, most similar first. Each entry
/// is `(document index, score)`.
pub fn rank_by_similarity(query: &[f64], documents: &[Vec<f64>]) -> Vec<(usize, f64)> {
    let mut scores: Vec<(usize, f64)> = documents
        .iter()
        .enumerate()
        .map(|(index, vector)| (index, cosine_similarity(query, vector)))
        .collect();
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores
}

/// Index and score of the document most similar to the query.
pub fn best_match(query: &[f64], documents: &[Vec<f64>]) -> Option<(usize, f64)> {
    rank_by_similarity(query, documents).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::{best_match, cosine_similarity, rank_by_similarity};

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![0.3, -0.7, 1.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let score = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!((score + 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn ranking_orders_most_similar_first() {
        let query = vec![1.0, 0.0];
        let documents = vec![
            vec![0.0, 1.0],  // orthogonal
            vec![1.0, 0.1],  // close
            vec![-1.0, 0.0], // opposite
        ];
        let ranked = rank_by_similarity(&query, &documents);
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[2].0, 2);
        assert_eq!(best_match(&query, &documents).unwrap().0, 1);
    }

    #[test]
    fn best_match_on_empty_corpus_is_none() {
        assert!(best_match(&[1.0], &[]).is_none());
    }
}
