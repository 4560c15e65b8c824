use std::env;

use buddy_chain::AnswerPipeline;
use buddy_core::config::Config;
use buddy_core::Personality;
use buddy_embed::build_embedder;
use buddy_llm::GeminiClient;
use buddy_server::init_tracing;
use buddy_vector::Retriever;

const DEFAULT_QUESTION: &str = "I miss my ex";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Config::load()?.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut personality = settings.server.default_personality;
    let mut words = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--personality" | "-p" => {
                let Some(label) = args.get(i + 1) else { anyhow::bail!("--personality requires a value (Funny, Savage or Gentle)") };
                personality = label.parse::<Personality>()?;
                i += 1;
            }
            arg => words.push(arg.to_string()),
        }
        i += 1;
    }
    let question = if words.is_empty() { DEFAULT_QUESTION.to_string() } else { words.join(" ") };

    let embedder = build_embedder(&settings.embed)?;
    let generator = GeminiClient::from_settings(&settings.llm)?;
    let pipeline = AnswerPipeline::new(Retriever::new(embedder, &settings.index), generator, settings.retrieval.k);

    println!("Personality: {}\nQuestion: {question}\n", personality.label());
    let reply = pipeline.answer_as(&question, personality).await?;
    println!("{reply}");
    Ok(())
}
