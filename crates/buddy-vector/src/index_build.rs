//! IVF-PQ training for large FAQ tables.
//!
//! Small tables are searched exactly (flat scan). Once a build reaches
//! `index.ann_min_rows` rows an IVF-PQ index is trained on `vector` with cosine
//! distance so query latency stays flat.

use lancedb::index::{vector::IvfPqIndexBuilder, Index};
use lancedb::{Connection, DistanceType};
use tracing::info;

use buddy_core::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvfPqParams {
    pub nlist: usize,
    pub m: usize,
}

pub fn compute_ivfpq_params(total_rows: usize, dim: usize) -> IvfPqParams {
    let sqrt_n = (total_rows as f64).sqrt() as usize;
    let mut nlist = sqrt_n.clamp(16, 65536);
    // Clamp nlist to be less than total_rows for tiny datasets
    if total_rows > 1 {
        nlist = nlist.min(total_rows - 1);
    } else {
        nlist = 1;
    }
    let preferred = if dim >= 1024 { 32 } else { 16 };
    let m = [preferred, 16, 8, 4, 2, 1].into_iter().find(|m| dim % m == 0).unwrap_or(1);
    IvfPqParams { nlist, m }
}

pub async fn build_ivfpq_index(conn: &Connection, table: &str, params: &IvfPqParams) -> Result<()> {
    let t = conn.open_table(table).execute().await.map_err(Error::storage)?;
    t.create_index(
        &["vector"],
        Index::IvfPq(
            IvfPqIndexBuilder::default()
                .distance_type(DistanceType::Cosine)
                .num_partitions(params.nlist as u32)
                .num_sub_vectors(params.m as u32),
        ),
    )
    .execute()
    .await
    .map_err(Error::storage)?;
    info!(nlist = params.nlist, m = params.m, "trained IVF-PQ index");
    Ok(())
}
