use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::mods::ModRepository;
use crate::mods::cache::FileCache;
use crate::mods::models::{Project, ReleaseFile};
use crate::mods::select::FileFilter;
use crate::storage::Manifest;
use crate::storage::reconcile;
use crate::ui::progress::{ProgressSink, ProgressUpdate};
use crate::ui::{self, CONFIRM_PROMPT, Confirm};

pub mod plan;
pub mod state;

use plan::{plan_install, plan_update};
use state::Outcome;

/// One run of the tool against one remote. Owns the per-run file cache.
pub struct Engine<R> {
    repo: R,
    cache: FileCache,
    filter: FileFilter,
}

impl<R: ModRepository> Engine<R> {
    pub fn new(repo: R, filter: FileFilter) -> Self {
        Self {
            repo,
            cache: FileCache::new(),
            filter,
        }
    }

    pub async fn search(&self, queries: &[String]) -> Result<Vec<(String, Vec<Project>)>> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            debug!("engine: searching for '{query}'");
            let projects = self.repo.search(query).await?;
            results.push((query.clone(), projects));
        }
        Ok(results)
    }

    /// Look up every slug, then fail once with all the ones that matched
    /// nothing.
    pub async fn resolve_slugs(&self, slugs: &[String]) -> Result<Vec<Project>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut unknown = Vec::new();
        for slug in slugs {
            if !seen.insert(slug.as_str()) {
                continue;
            }
            let candidates = self.repo.search(slug).await?;
            match candidates.into_iter().find(|p| p.slug == *slug) {
                Some(project) => found.push(project),
                None => unknown.push(slug.clone()),
            }
        }
        if !unknown.is_empty() {
            return Err(Error::UnknownSlugs(unknown));
        }
        Ok(found)
    }

    pub async fn install(
        &mut self,
        manifest: &mut Manifest,
        slugs: &[String],
        confirm: &mut dyn Confirm,
        progress: &mut dyn ProgressSink,
    ) -> Result<Outcome> {
        debug!("engine: fetching server mods");
        let projects = self.resolve_slugs(slugs).await?;
        debug!("engine: building list of files");
        self.cache
            .ensure(&self.repo, projects.iter().map(|p| p.id))
            .await?;

        let plan = plan_install(&projects, &self.cache, &self.filter);
        if plan.is_blocked() {
            return Err(Error::LackingJars(plan.unqualified_slugs()));
        }

        println!("{}", ui::render_install_plan(&plan, manifest.dir()));
        if !confirm.confirm(CONFIRM_PROMPT).map_err(Error::Prompt)? {
            return Ok(Outcome::Declined);
        }

        let count = plan.fetchable.len();
        let mut changed = Vec::with_capacity(count);
        for (index, item) in plan.fetchable.iter().enumerate() {
            let local_name = item.local_name();
            let dest = manifest.dir().join(&local_name);
            fetch_into(
                &self.repo,
                item.file,
                &dest,
                &item.project.name,
                index + 1,
                count,
                progress,
            )
            .await?;
            manifest.record_install(item.project.id, &item.project.name, item.file, &local_name)?;
            manifest.save()?;
            changed.push(item.project.name.clone());
        }
        Ok(Outcome::Completed { changed })
    }

    pub async fn update(
        &mut self,
        manifest: &mut Manifest,
        confirm: &mut dyn Confirm,
        progress: &mut dyn ProgressSink,
    ) -> Result<Outcome> {
        debug!("engine: checking installed plugins");
        let report = reconcile::reconcile(manifest)?;
        if !report.is_clean() {
            print!("{}", ui::render_reconcile(&report));
        }
        if manifest.is_empty() {
            return Err(Error::NothingInstalled);
        }

        debug!("engine: checking for updates");
        let ids: Vec<_> = manifest
            .entries()
            .values()
            .map(|entry| entry.server_mod_id)
            .collect();
        self.cache.ensure(&self.repo, ids).await?;

        let plan = plan_update(manifest, &self.cache, &self.filter);
        println!("{}", ui::render_update_summary(&plan, manifest.dir()));
        if !plan.has_work() {
            return Ok(Outcome::NothingToDo);
        }
        if !confirm.confirm(CONFIRM_PROMPT).map_err(Error::Prompt)? {
            return Ok(Outcome::Declined);
        }

        let count = plan.updates.len();
        let mut changed = Vec::with_capacity(count);
        for (index, item) in plan.updates.iter().enumerate() {
            let tracked = &item.tracked;
            let dest = manifest.dir().join(&tracked.local_name);
            fetch_into(
                &self.repo,
                item.file,
                &dest,
                &tracked.project_name,
                index + 1,
                count,
                progress,
            )
            .await?;
            manifest.record_install(
                tracked.project_id,
                &tracked.project_name,
                item.file,
                &tracked.local_name,
            )?;
            manifest.save()?;
            changed.push(tracked.project_name.clone());
        }
        Ok(Outcome::Completed { changed })
    }

    pub async fn uninstall(
        &mut self,
        manifest: &mut Manifest,
        slugs: &[String],
        confirm: &mut dyn Confirm,
    ) -> Result<Outcome> {
        let projects = self.resolve_slugs(slugs).await?;
        let report = reconcile::reconcile(manifest)?;
        if !report.is_clean() {
            print!("{}", ui::render_reconcile(&report));
        }

        let not_installed: Vec<String> = projects
            .iter()
            .filter(|p| manifest.entry(p.id).is_none())
            .map(|p| p.slug.clone())
            .collect();
        if !not_installed.is_empty() {
            return Err(Error::NotInstalled(not_installed));
        }

        let listed: Vec<String> = projects
            .iter()
            .filter_map(|p| manifest.entry(p.id))
            .map(|entry| format!("{} ({})", entry.server_mod_name, entry.filename))
            .collect();
        println!("{}", ui::render_uninstall_plan(&listed));
        if !confirm.confirm(CONFIRM_PROMPT).map_err(Error::Prompt)? {
            return Ok(Outcome::Declined);
        }

        let mut changed = Vec::with_capacity(projects.len());
        for project in &projects {
            let Some(entry) = manifest.entry(project.id).cloned() else {
                continue;
            };
            let path = manifest.dir().join(&entry.filename);
            match fs::remove_file(&path) {
                Ok(()) => info!("engine: removed {}", path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(Error::Io {
                        action: "remove",
                        path,
                        source,
                    });
                }
            }
            manifest.record_removal(project.id);
            manifest.save()?;
            changed.push(entry.server_mod_name);
        }
        Ok(Outcome::Completed { changed })
    }
}

/// Reconcile and describe what is installed. Needs no network.
pub fn list_installed(manifest: &mut Manifest) -> Result<String> {
    let report = reconcile::reconcile(manifest)?;
    if !report.is_clean() {
        manifest.save()?;
    }
    Ok(format!(
        "{}{}",
        ui::render_reconcile(&report),
        ui::render_installed(manifest)
    ))
}

async fn fetch_into<R: ModRepository>(
    repo: &R,
    file: &ReleaseFile,
    dest: &Path,
    label: &str,
    index: usize,
    count: usize,
    progress: &mut dyn ProgressSink,
) -> Result<u64> {
    progress.update(&ProgressUpdate {
        label,
        downloaded: None,
        total: None,
        index,
        count,
    });
    let mut report = |downloaded: u64, total: Option<u64>| {
        progress.update(&ProgressUpdate {
            label,
            downloaded: Some(downloaded),
            total,
            index,
            count,
        });
    };
    let bytes = repo.download(&file.download_url, dest, &mut report).await?;
    progress.finish(label);
    info!(
        "engine: fetched {} for {} ({bytes} bytes) into {}",
        file.file_name,
        file.game_version,
        dest.display()
    );
    Ok(bytes)
}
