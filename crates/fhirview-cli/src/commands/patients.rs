use anyhow::Result;
use fhirview_core::age::today_utc;
use fhirview_core::grid::{Grid, SortDirection, SortSpec};
use fhirview_core::{SearchForm, normalize_bundle};

use crate::cli::{OutputFormat, ViewArgs};
use crate::client::{Fetched, FhirClient};
use crate::output::{print_detail, print_grid};

pub async fn list(client: &FhirClient, view: &ViewArgs, format: OutputFormat) -> Result<()> {
    let grid = prepared_grid(view)?;
    show(grid, client.fetch_all().await?, view, format)
}

pub async fn range(
    client: &FhirClient,
    from: Option<&str>,
    to: Option<&str>,
    view: &ViewArgs,
    format: OutputFormat,
) -> Result<()> {
    let grid = prepared_grid(view)?;
    show(grid, client.fetch_by_birth_range(from, to).await?, view, format)
}

pub async fn search(
    client: &FhirClient,
    name: Option<&str>,
    birth_date: Option<&str>,
    view: &ViewArgs,
    format: OutputFormat,
) -> Result<()> {
    // An invalid form never reaches the server
    let query = SearchForm::new(name, birth_date).submit()?;
    let grid = prepared_grid(view)?;
    show(grid, client.fetch(&query).await?, view, format)
}

fn prepared_grid(view: &ViewArgs) -> Result<Grid> {
    let mut grid = Grid::default();
    apply_view(&mut grid, view)?;
    Ok(grid)
}

fn show(mut grid: Grid, fetched: Fetched, view: &ViewArgs, format: OutputFormat) -> Result<()> {
    grid.replace(normalize_bundle(&fetched.bundle, today_utc()));

    print_grid(&grid, Some(fetched.elapsed), format)?;
    if let Some(key) = &view.expand {
        println!();
        print_detail(grid.expand(key)?)?;
    }
    Ok(())
}

pub fn apply_view(grid: &mut Grid, view: &ViewArgs) -> Result<()> {
    if let Some(column) = &view.sort {
        let direction = if view.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        grid.set_sort(Some(SortSpec {
            column: column.parse()?,
            direction,
        }));
    }
    if let Some(filter) = &view.filter {
        grid.set_filter(filter.as_str());
    }
    Ok(())
}
