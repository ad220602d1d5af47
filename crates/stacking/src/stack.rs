//! Composite construction from located band files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use scene_common::{ProductCode, SceneId};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, StackError};
use crate::raster::RasterTool;

/// Where the composite for `scene` lives under `output_root`:
/// `<output_root>/<base>/<base>_<product>stack.tif`.
pub fn output_path(output_root: &Path, scene: &SceneId, product: &ProductCode) -> PathBuf {
    output_root
        .join(scene.base())
        .join(scene.stack_file_name(product))
}

/// Everything needed to stack one scene.
#[derive(Debug, Clone)]
pub struct StackJob {
    pub scene: SceneId,
    /// Band files in composite order
    pub bands: Vec<PathBuf>,
    /// Virtual descriptor written inside the workspace
    pub descriptor: PathBuf,
    /// Final composite path
    pub output: PathBuf,
}

impl StackJob {
    pub fn new(
        scene: SceneId,
        product: &ProductCode,
        bands: Vec<PathBuf>,
        workspace: &Path,
        output_root: &Path,
    ) -> Self {
        let descriptor = workspace.join(scene.descriptor_file_name());
        let output = output_path(output_root, &scene, product);
        Self {
            scene,
            bands,
            descriptor,
            output,
        }
    }

    /// Temporary path the translate step writes before the final rename.
    pub fn partial_output(&self) -> PathBuf {
        let mut name = self.output.as_os_str().to_owned();
        name.push(".partial");
        PathBuf::from(name)
    }
}

/// Phase of a build, reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPhase {
    BuildingDescriptor,
    Materializing,
}

/// Builds multi-band composites through a [`RasterTool`].
#[derive(Clone)]
pub struct StackBuilder {
    tool: Arc<dyn RasterTool>,
}

impl StackBuilder {
    pub fn new(tool: Arc<dyn RasterTool>) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &Arc<dyn RasterTool> {
        &self.tool
    }

    /// Build the composite for `job`.
    ///
    /// The composite appears at `job.output` only once complete: the
    /// translate step writes a `.partial` file that is renamed into place,
    /// and removed again if anything fails.
    pub async fn build<F>(&self, job: &StackJob, mut on_phase: F) -> Result<PathBuf>
    where
        F: FnMut(StackPhase) + Send,
    {
        if job.bands.is_empty() {
            return Err(StackError::RasterOpen(format!(
                "no band files for {}",
                job.scene
            )));
        }

        on_phase(StackPhase::BuildingDescriptor);
        self.tool.build_vrt(&job.bands, &job.descriptor).await?;

        if let Some(parent) = job.output.parent() {
            fs::create_dir_all(parent).await?;
        }

        on_phase(StackPhase::Materializing);
        let partial = job.partial_output();
        let materialized = match self.tool.translate(&job.descriptor, &partial).await {
            Ok(()) => fs::rename(&partial, &job.output).await.map_err(StackError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = materialized {
            discard_partial(&partial).await;
            return Err(e);
        }

        debug!(
            scene = %job.scene,
            bands = job.bands.len(),
            output = %job.output.display(),
            "Composite written"
        );
        Ok(job.output.clone())
    }
}

async fn discard_partial(partial: &Path) {
    match fs::remove_file(partial).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %partial.display(), error = %e, "Failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const OLI: &str = "LC08_CU_003008_20170525_20181121_C01_V01";

    /// Records calls; translate writes its output unless told to fail.
    #[derive(Default)]
    struct RecordingTool {
        calls: Mutex<Vec<String>>,
        fail_translate: bool,
    }

    #[async_trait]
    impl RasterTool for RecordingTool {
        async fn build_vrt(&self, inputs: &[PathBuf], descriptor: &Path) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("vrt:{}", inputs.len()));
            std::fs::write(descriptor, b"vrt")?;
            Ok(())
        }

        async fn translate(&self, source: &Path, output: &Path) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("translate:{}", output.display()));
            std::fs::write(output, std::fs::read(source)?)?;
            if self.fail_translate {
                return Err(StackError::RasterOpen("disk full".to_string()));
            }
            Ok(())
        }

        async fn info(&self, _raster: &Path) -> Result<RasterInfo> {
            Err(StackError::RasterOpen("not supported".to_string()))
        }
    }

    fn job(workspace: &Path, out: &Path) -> StackJob {
        let scene = SceneId::parse(OLI).unwrap();
        let product = ProductCode::new("TA").unwrap();
        let bands = vec![workspace.join("b2.tif"), workspace.join("b3.tif")];
        StackJob::new(scene, &product, bands, workspace, out)
    }

    #[test]
    fn test_job_paths() {
        let job = job(Path::new("/work/worker0"), Path::new("/out"));
        assert_eq!(
            job.descriptor,
            PathBuf::from(format!("/work/worker0/{}.vrt", OLI))
        );
        assert_eq!(
            job.output,
            PathBuf::from(format!("/out/{0}/{0}_TAstack.tif", OLI))
        );
        assert_eq!(
            job.partial_output(),
            PathBuf::from(format!("/out/{0}/{0}_TAstack.tif.partial", OLI))
        );
    }

    #[tokio::test]
    async fn test_build_creates_output_directory() {
        let ws = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tool = Arc::new(RecordingTool::default());
        let builder = StackBuilder::new(tool.clone());
        let job = job(ws.path(), out.path());

        let mut phases = Vec::new();
        let written = builder.build(&job, |p| phases.push(p)).await.unwrap();

        assert_eq!(written, job.output);
        assert!(job.output.is_file());
        assert!(!job.partial_output().exists());
        assert_eq!(
            phases,
            vec![StackPhase::BuildingDescriptor, StackPhase::Materializing]
        );
        assert_eq!(tool.calls.lock().unwrap()[0], "vrt:2");
    }

    #[tokio::test]
    async fn test_failed_translate_leaves_no_output() {
        let ws = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tool = Arc::new(RecordingTool {
            fail_translate: true,
            ..Default::default()
        });
        let builder = StackBuilder::new(tool);
        let job = job(ws.path(), out.path());

        let err = builder.build(&job, |_| {}).await.unwrap_err();
        assert!(matches!(err, StackError::RasterOpen(_)));
        assert!(!job.output.exists());
        assert!(!job.partial_output().exists());
    }

    #[tokio::test]
    async fn test_empty_band_list_rejected() {
        let ws = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let builder = StackBuilder::new(Arc::new(RecordingTool::default()));
        let mut job = job(ws.path(), out.path());
        job.bands.clear();

        assert!(builder.build(&job, |_| {}).await.is_err());
        assert!(!job.output.exists());
    }
}
