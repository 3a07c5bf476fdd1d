use doc_rag::commands::{QuestionLoop, TerminalInput};
use doc_rag::config::{AppConfig, StoreConfig};
use doc_rag::database::{DocumentIndex, QdrantStore, SqliteStore, VectorStore};
use doc_rag::document::DocumentLoader;
use doc_rag::llm::RagChain;
use doc_rag::providers::{GroqProvider, JinaEmbedder};
use anyhow::Context;
use colored::Colorize;
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Configuration errors, including a bad template or chunk settings,
    // stop here before the store is opened or anything is ingested.
    let config = AppConfig::from_env()?;
    let prompt = config.prompt_template().await?;
    let splitter = config.text_splitter()?;

    let embedder = Arc::new(JinaEmbedder::with_endpoint(
        config.embedding.api_key.clone(),
        config.embedding.api_url.clone(),
        config.embedding.model.clone(),
    )?);

    if config.chat.api_key.is_none() {
        warn!("GROQ_API_KEY is not set; questions will fail at the generation step");
    }
    let llm = Arc::new(GroqProvider::new(
        config.chat.api_key.clone(),
        config.chat.api_url.clone(),
        config.chat.model.clone(),
        config.chat.temperature,
    ));

    let store: Arc<dyn VectorStore> = match &config.store {
        StoreConfig::Local { persist_dir } => Arc::new(SqliteStore::open(persist_dir).await?),
        StoreConfig::Qdrant { url, collection } => Arc::new(QdrantStore::new(url, collection).await?),
    };
    let index = DocumentIndex::new(embedder, store).with_batch_size(config.embed_batch_size);

    let documents = DocumentLoader::new(&config.document).load().await?;
    let chunks = splitter.split_documents(&documents);
    info!(
        "Split {} into {} chunks (size {}, overlap {})",
        config.document.display(),
        chunks.len(),
        splitter.chunk_size(),
        splitter.chunk_overlap()
    );

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:30} {pos}/{len} chunks embedded")?,
    );
    index
        .add_chunks(&chunks, |done| pb.set_position(done as u64))
        .await
        .context("Failed to ingest document")?;
    pb.finish_and_clear();
    info!("Vector index now holds {} chunks", index.count().await?);

    let chain = RagChain::new(index.as_retriever(config.top_k), llm, prompt);

    println!(
        "{}",
        format!("Ready. Asking {} with the top {} chunks per question.", config.chat.model, config.top_k)
            .as_str()
            .bright_green()
    );

    let mut input = TerminalInput::new()?;
    let mut questions = QuestionLoop::new(chain, std::io::stdout());
    let asked = questions.run(&mut input).await?;
    info!("Session ended after {} question(s)", asked);

    Ok(())
}
