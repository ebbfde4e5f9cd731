//! `levels` - print the level table.

use globelayer::geo::WGS84_EQUATORIAL_RADIUS;
use globelayer::level::LevelSet;

use crate::error::CliError;
use crate::runner::CliRunner;

pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("levels");
    let levels = runner.level_set()?;
    print!("{}", level_table(&levels));
    Ok(())
}

fn level_table(levels: &LevelSet) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Level set {} covering {}\n",
        levels.first_level().cache_name(),
        levels.sector()
    ));
    out.push_str(&format!(
        "Level-zero columns: {}\n\n",
        levels.num_level_zero_columns()
    ));
    out.push_str(&format!(
        "{:>5}  {:<8} {:>12} {:>14} {:>12}  {}\n",
        "level", "name", "delta (deg)", "texel (rad)", "texel (m)", "empty"
    ));
    for level in levels.levels() {
        out.push_str(&format!(
            "{:>5}  {:<8} {:>12.6} {:>14.3e} {:>12.2}  {}\n",
            level.number(),
            level.name(),
            level.tile_delta().lat,
            level.texel_size(),
            level.texel_size() * WGS84_EQUATORIAL_RADIUS,
            if level.is_empty() { "yes" } else { "" }
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use globelayer::level::LevelSetConfig;

    #[test]
    fn test_table_lists_every_level() {
        let levels = LevelSet::new(
            LevelSetConfig::new("Earth/Test")
                .with_num_levels(4)
                .with_num_empty_levels(1),
        )
        .unwrap();
        let table = level_table(&levels);
        assert!(table.contains("Level-zero columns: 10"));
        // Header block plus one row per level
        assert_eq!(table.lines().count(), 4 + 4);
        assert!(table.lines().nth(4).unwrap().trim_end().ends_with("yes"));
    }
}
