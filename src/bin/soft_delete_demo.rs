

use std::path::PathBuf;
use std::sync::Arc;

use bson::{Bson, doc};
use futures::TryStreamExt;
use mongo_soft_delete::{
    MemoryCollection, SoftDeleteCollection, SoftDeleteConfig, SoftDeleteStore,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("mongo_soft_delete=info".parse()?)
                .add_directive("soft_delete_demo=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mut use_mongo = false;
    let mut config_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mongo" => use_mongo = true,
            "--config" => config_path = args.next().map(PathBuf::from),
            other => anyhow::bail!("unknown argument: {}", other),
        }
    }

    let config = SoftDeleteConfig::load(config_path.as_deref())?;

    let store: Arc<dyn SoftDeleteStore> = if use_mongo {
        info!("Using MongoDB at {} ({})", config.mongo_uri, config.namespace());
        SoftDeleteCollection::connect(&config).await?.into_shared()
    } else {
        info!("Using in-memory collection {}", config.collection);
        SoftDeleteCollection::with_fields(MemoryCollection::new(&config.collection), config.fields.clone())
            .into_shared()
    };

    run(store.as_ref()).await
}

async fn run(store: &dyn SoftDeleteStore) -> anyhow::Result<()> {
    let inserted = store
        .insert_many(
            vec![
                doc! { "title": "quarterly report", "owner": "ada" },
                doc! { "title": "draft notes", "owner": "ada" },
                doc! { "title": "roadmap", "owner": "bob" },
            ],
            None,
        )
        .await?;
    info!("Inserted {} documents", inserted.inserted_ids.len());

    let draft = inserted.inserted_ids.get(&1).cloned().unwrap_or(Bson::Null);
    let outcome = store.soft_delete_by_id(draft.clone(), Some(Bson::String("demo".into()))).await?;
    info!("Soft delete matched {} document(s)", outcome.matched_count);

    let renamed = store
        .update_by_id(draft, doc! { "$set": { "title": "resurrected?" } }, None)
        .await?;
    info!("Update of deleted draft matched {} document(s)", renamed.matched_count);

    let active: Vec<_> = store.find(None, None).await?.try_collect().await?;
    for document in &active {
        let json = Bson::Document(document.clone()).into_relaxed_extjson();
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    let per_owner: Vec<_> = store
        .aggregate(
            vec![
                doc! { "$match": { "owner": "ada" } },
                doc! { "$count": "active" },
            ]
            .into(),
            None,
        )
        .await?
        .try_collect()
        .await?;
    info!("Active documents owned by ada: {:?}", per_owner);

    info!("Active total: {}", store.count_documents(None, None).await?);
    Ok(())
}
