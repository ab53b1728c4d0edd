//! Compatibility resolution: CPU → motherboards, motherboard → RAM.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use normalizer::ComponentType;

use crate::error::{CompatError, Result};
use crate::record::CompatibilityRecord;
use crate::store::CompatStore;

/// Records need at least this much confidence in the deciding field to
/// count as compatible in strict mode.
pub const CONFIDENCE_FLOOR: f64 = 0.70;

/// How to treat records whose deciding field is missing or weakly
/// extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Only records meeting the confidence floor are compatible.
    Strict,
    /// Strict set plus uncertain records, reported separately.
    Lenient,
}

/// The queried CPU, summarized for the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuSummary {
    pub id: Uuid,
    pub socket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

/// The queried motherboard, summarized for the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotherboardSummary {
    pub id: Uuid,
    pub memory_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chipset: Option<String>,
}

/// Motherboards compatible with a CPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotherboardMatches {
    pub cpu: CpuSummary,
    pub mode: QueryMode,
    pub compatible: Vec<Uuid>,
    pub unknown: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// RAM compatible with a motherboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RamMatches {
    pub motherboard: MotherboardSummary,
    pub mode: QueryMode,
    pub compatible: Vec<Uuid>,
    pub unknown: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Compatibility resolution over a [`CompatStore`].
pub struct CompatService<S> {
    store: S,
}

impl<S: CompatStore> CompatService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn get_typed(
        &self,
        product_id: Uuid,
        expected: ComponentType,
    ) -> Result<CompatibilityRecord> {
        let record = self
            .store
            .get(product_id)
            .await?
            .ok_or(CompatError::RecordNotFound { product_id })?;
        if record.component_type != expected {
            return Err(CompatError::WrongComponentType {
                product_id,
                expected,
                actual: record.component_type,
            });
        }
        Ok(record)
    }

    /// Which motherboards work with this CPU.
    ///
    /// A CPU with no extractable socket returns the full motherboard set
    /// with a warning in both modes — a dead-end empty result is worse
    /// UX than an imprecise one.
    pub async fn compatible_motherboards(
        &self,
        cpu_id: Uuid,
        mode: QueryMode,
    ) -> Result<MotherboardMatches> {
        let cpu = self.get_typed(cpu_id, ComponentType::Cpu).await?;
        let summary = CpuSummary {
            id: cpu.product_id,
            socket: cpu.socket.clone(),
            brand: cpu.brand.clone(),
            generation: cpu.generation.clone(),
        };

        let Some(socket) = cpu.socket.as_deref() else {
            let all = self.store.list(ComponentType::Motherboard).await?;
            debug!(cpu_id = %cpu_id, boards = all.len(), "CPU socket unknown; returning all motherboards");
            return Ok(MotherboardMatches {
                cpu: summary,
                mode,
                compatible: all.into_iter().map(|r| r.product_id).collect(),
                unknown: Vec::new(),
                warning: Some(
                    "CPU socket could not be determined; showing all motherboards".to_string(),
                ),
            });
        };

        let (compatible, unknown) = self
            .partition(ComponentType::Motherboard, socket, mode, |r| {
                r.socket.as_deref()
            })
            .await?;

        Ok(MotherboardMatches {
            cpu: summary,
            mode,
            compatible,
            unknown,
            warning: None,
        })
    }

    /// Which RAM works with this motherboard.
    ///
    /// Unlike the CPU path there is no default-all fallback: without a
    /// memory-type anchor the answer would be noise, so an unknown
    /// motherboard memory type is an explicit error.
    pub async fn compatible_ram(
        &self,
        motherboard_id: Uuid,
        mode: QueryMode,
    ) -> Result<RamMatches> {
        let board = self
            .get_typed(motherboard_id, ComponentType::Motherboard)
            .await?;
        let summary = MotherboardSummary {
            id: board.product_id,
            memory_type: board.memory_type.clone(),
            socket: board.socket.clone(),
            chipset: board.chipset.clone(),
        };

        let Some(memory_type) = board.memory_type.as_deref() else {
            return Err(CompatError::UnknownMemoryType {
                product_id: motherboard_id,
            });
        };

        let (compatible, unknown) = self
            .partition(ComponentType::Ram, memory_type, mode, |r| {
                r.memory_type.as_deref()
            })
            .await?;

        let warning = (board.confidence < CONFIDENCE_FLOOR).then(|| {
            format!(
                "motherboard memory type {} was extracted with low confidence",
                memory_type
            )
        });

        Ok(RamMatches {
            motherboard: summary,
            mode,
            compatible,
            unknown,
            warning,
        })
    }

    /// Split candidate records into (compatible, unknown) for a wanted
    /// deciding-field value.
    ///
    /// Strict: deciding field equals the wanted value at or above the
    /// confidence floor. Lenient adds every candidate whose deciding
    /// field is missing or below the floor — those claims are too weak
    /// to exclude on.
    async fn partition(
        &self,
        component_type: ComponentType,
        wanted: &str,
        mode: QueryMode,
        field: impl Fn(&CompatibilityRecord) -> Option<&str>,
    ) -> Result<(Vec<Uuid>, Vec<Uuid>)> {
        let candidates = self.store.list(component_type).await?;

        let mut compatible = Vec::new();
        let mut unknown = Vec::new();
        for record in &candidates {
            match field(record) {
                Some(value) if value == wanted && record.confidence >= CONFIDENCE_FLOOR => {
                    compatible.push(record.product_id);
                }
                Some(_) if record.confidence >= CONFIDENCE_FLOOR => {
                    // Confident mismatch: incompatible in both modes.
                }
                _ => {
                    if mode == QueryMode::Lenient {
                        unknown.push(record.product_id);
                    }
                }
            }
        }
        Ok((compatible, unknown))
    }
}
