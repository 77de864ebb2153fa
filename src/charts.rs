// Dashboard chart pipelines built on the aggregation primitives

use indexmap::IndexMap;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use tracing::debug;

use crate::aggregate::{aggregate, bucket_means, group_values, AggregateBucket, Extractors};
use crate::align::align_observed;
use crate::data::{distinct_models, CategoryField, Field, Record};
use crate::ir::{AxisLabel, DistributionChart, ScatterChart, ScatterPoint, SeriesChart};
use crate::palette::ColorTable;
use crate::parser::KeyTemplate;
use crate::pivot::{build_matrix, PivotMatrix};
use crate::rank::{ranked_means, top_and_bottom, Ranking};
use crate::sample::sample;
use crate::summary::{summarize, Distribution};

pub const ACTUAL_PRICE: &str = "Actual Price";
pub const ACTUAL_COLOR: &str = "red";
pub const AVERAGE_PRICE: &str = "Average Price";
pub const AVERAGE_COLOR: &str = "rgba(153, 102, 255, 0.6)";
pub const SCATTER_COLOR: &str = "rgba(75, 192, 192, 0.6)";

const PREDICTED: &str = "predicted_price";
const VALUE: &str = "value";

fn predicted_label(model: &str) -> String {
    format!("Predicted Price - {}", model)
}

/// Predicted price of records belonging to `model`.
fn predicted_for(model: &str) -> impl Fn(&Record) -> Option<f64> + '_ {
    move |r: &Record| {
        if r.model_name.as_deref() == Some(model) {
            r.predicted_price
        } else {
            None
        }
    }
}

fn records_of<'r>(records: &'r [Record], model: &'r str) -> impl Iterator<Item = &'r Record> + 'r {
    records
        .iter()
        .filter(move |r| r.model_name.as_deref() == Some(model))
}

/// Mean of every named field, one ordered point map per name. Fields that
/// never received a value are left out.
fn mean_series<'n, K: Ord + Clone>(
    buckets: &IndexMap<K, AggregateBucket>,
    names: impl IntoIterator<Item = &'n str>,
) -> IndexMap<String, BTreeMap<K, f64>> {
    names
        .into_iter()
        .map(|name| (name.to_string(), bucket_means(buckets, name)))
        .filter(|(_, points)| !points.is_empty())
        .collect()
}

fn styled<X: Ord + Clone>(
    series: IndexMap<String, BTreeMap<X, f64>>,
    styles: &HashMap<String, String>,
    colors: &ColorTable,
) -> SeriesChart<X> {
    SeriesChart::from_aligned(align_observed(&series), |name| {
        let color = styles
            .get(name)
            .cloned()
            .unwrap_or_else(|| colors.color_for(name).to_string());
        (name.to_string(), color)
    })
}

/// One mean predicted price series per model over `key_fn`.
fn predicted_by_model<K, F>(records: &[Record], key_fn: F, colors: &ColorTable) -> SeriesChart<K>
where
    K: Ord + Hash + Clone,
    F: Fn(&Record) -> Option<K>,
{
    let models = distinct_models(records);
    let extractors = models
        .iter()
        .fold(Extractors::new(), |ex, model| ex.with(model.as_str(), predicted_for(model)));
    let buckets = aggregate(records, key_fn, &extractors);
    styled(mean_series(&buckets, extractors.names()), &HashMap::new(), colors)
}

// =============================================================================
// Line and bar charts
// =============================================================================

/// Actual price against every model's predicted price by days left.
pub fn days_left_price_comparison(records: &[Record], colors: &ColorTable) -> SeriesChart<u32> {
    let models = distinct_models(records);
    let mut styles = HashMap::from([(ACTUAL_PRICE.to_string(), ACTUAL_COLOR.to_string())]);
    let mut extractors = Extractors::new().with(ACTUAL_PRICE, |r: &Record| r.actual_price);
    for model in &models {
        let label = predicted_label(model);
        styles.insert(label.clone(), colors.color_for(model).to_string());
        extractors = extractors.with(label, predicted_for(model));
    }

    let buckets = aggregate(records, |r: &Record| r.days_left, &extractors);
    debug!(models = models.len(), days = buckets.len(), "days left comparison");
    styled(mean_series(&buckets, extractors.names()), &styles, colors)
}

/// Mean predicted price by days left, one series per model.
pub fn model_performance_over_time(records: &[Record], colors: &ColorTable) -> SeriesChart<u32> {
    predicted_by_model(records, |r: &Record| r.days_left, colors)
}

/// Mean actual price by days left.
pub fn average_price_by_days_left(records: &[Record], colors: &ColorTable) -> SeriesChart<u32> {
    let extractors = Extractors::new().with(AVERAGE_PRICE, |r: &Record| r.actual_price);
    let buckets = aggregate(records, |r: &Record| r.days_left, &extractors);
    let styles = HashMap::from([(AVERAGE_PRICE.to_string(), AVERAGE_COLOR.to_string())]);
    styled(mean_series(&buckets, extractors.names()), &styles, colors)
}

/// Mean predicted price per route, one series per model.
pub fn route_price_comparison(records: &[Record], colors: &ColorTable) -> SeriesChart<String> {
    predicted_by_model(records, Record::route, colors)
}

// =============================================================================
// Rankings and heatmaps
// =============================================================================

/// Most and least expensive routes by mean predicted price for one model.
pub fn top_routes(records: &[Record], model: &str, n: usize) -> Ranking<String> {
    let extractors = Extractors::new().with(PREDICTED, |r: &Record| r.predicted_price);
    let buckets = aggregate(records_of(records, model), Record::route, &extractors);
    top_and_bottom(ranked_means(&buckets, PREDICTED), n)
}

/// Airline x days left matrix of one model's mean predicted price.
pub fn prediction_heatmap(records: &[Record], model: &str) -> PivotMatrix<String, u32> {
    build_matrix(
        records_of(records, model),
        |r: &Record| r.airline.clone(),
        |r: &Record| r.days_left,
        |r: &Record| r.predicted_price,
    )
}

/// Source x destination matrix of mean actual price. Pairs never flown are
/// `None`.
pub fn city_pair_heatmap(records: &[Record]) -> PivotMatrix<String, String> {
    build_matrix(
        records,
        |r: &Record| r.source_city.clone(),
        |r: &Record| r.destination_city.clone(),
        |r: &Record| r.actual_price,
    )
}

// =============================================================================
// Distributions
// =============================================================================

fn distribution_chart<R: Rng + ?Sized>(
    label: &str,
    groups: IndexMap<String, Vec<f64>>,
    colors: &ColorTable,
    k: usize,
    rng: &mut R,
) -> DistributionChart {
    let mut chart = DistributionChart {
        label: label.to_string(),
        labels: Vec::with_capacity(groups.len()),
        data: Vec::with_capacity(groups.len()),
        colors: Vec::with_capacity(groups.len()),
        summaries: Vec::with_capacity(groups.len()),
    };
    for (name, values) in groups {
        let Some(summary) = summarize(&values) else {
            continue;
        };
        chart.data.push(sample(&values, k, rng));
        chart.colors.push(colors.color_for(&name).to_string());
        chart.labels.push(name);
        chart.summaries.push(summary);
    }
    chart
}

/// Prediction error per model. At most `k` values per model are kept for
/// drawing; the summaries cover all of them.
pub fn error_distribution<R: Rng + ?Sized>(
    records: &[Record],
    colors: &ColorTable,
    k: usize,
    rng: &mut R,
) -> DistributionChart {
    let groups = group_values(records, |r: &Record| r.model_name.clone(), Record::price_error);
    distribution_chart("Prediction Error", groups, colors, k, rng)
}

/// Actual price per category value of `by`, labels sorted.
pub fn price_distribution<R: Rng + ?Sized>(
    records: &[Record],
    by: CategoryField,
    colors: &ColorTable,
    k: usize,
    rng: &mut R,
) -> DistributionChart {
    let mut groups = group_values(
        records,
        |r: &Record| r.category(by).map(str::to_string),
        |r: &Record| r.actual_price,
    );
    groups.sort_keys();
    distribution_chart(&format!("Price by {}", by), groups, colors, k, rng)
}

/// Per-model prediction error statistics over the full data.
pub fn error_summary(records: &[Record]) -> IndexMap<String, Distribution> {
    group_values(records, |r: &Record| r.model_name.clone(), Record::price_error)
        .into_iter()
        .filter_map(|(model, errors)| Some((model, summarize(&errors)?)))
        .collect()
}

/// Flight duration against actual price, at most `k` points.
pub fn duration_scatter<R: Rng + ?Sized>(records: &[Record], k: usize, rng: &mut R) -> ScatterChart {
    let points: Vec<ScatterPoint> = records
        .iter()
        .filter_map(|r| {
            let (x, y) = (r.duration?, r.actual_price?);
            (x.is_finite() && y.is_finite()).then_some(ScatterPoint { x, y })
        })
        .collect();
    ScatterChart {
        label: "Duration vs Price".to_string(),
        color: SCATTER_COLOR.to_string(),
        points: sample(&points, k, rng),
    }
}

// =============================================================================
// Template driven charts
// =============================================================================

/// Mean of `value` grouped by `key`.
///
/// With `series` set, records are split into one dataset per rendered series
/// key; otherwise a single dataset named after `value` is produced.
pub fn custom_series(
    records: &[Record],
    key: &KeyTemplate,
    value: Field,
    series: Option<&KeyTemplate>,
    colors: &ColorTable,
) -> SeriesChart<AxisLabel> {
    let series_of = |r: &Record| match series {
        Some(template) => template.render(r),
        None => Some(value.name().to_string()),
    };
    let extractors = Extractors::new().with(VALUE, move |r: &Record| r.value(value));
    let buckets = aggregate(
        records,
        |r: &Record| Some((series_of(r)?, AxisLabel::from(key.render(r)?))),
        &extractors,
    );

    let mut points: IndexMap<String, BTreeMap<AxisLabel, f64>> = IndexMap::new();
    for ((name, x), bucket) in &buckets {
        if let Some(mean) = bucket.mean(VALUE) {
            points.entry(name.clone()).or_default().insert(x.clone(), mean);
        }
    }
    debug!(key = %key, value = %value, series = points.len(), "custom series");
    styled(points, &HashMap::new(), colors)
}

/// Pivot of `value` means with template driven row and column keys.
pub fn custom_pivot(
    records: &[Record],
    row: &KeyTemplate,
    col: &KeyTemplate,
    value: Field,
) -> PivotMatrix<AxisLabel, AxisLabel> {
    build_matrix(
        records,
        |r: &Record| row.render(r).map(AxisLabel::from),
        |r: &Record| col.render(r).map(AxisLabel::from),
        |r: &Record| r.value(value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Dataset;
    use crate::parser::parse_key_spec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rec(model: &str, airline: &str, route: (&str, &str), days: u32, actual: f64, predicted: f64) -> Record {
        Record {
            model_name: Some(model.into()),
            airline: Some(airline.into()),
            source_city: Some(route.0.into()),
            destination_city: Some(route.1.into()),
            travel_class: Some("Economy".into()),
            duration: Some(2.0 + f64::from(days) / 10.0),
            days_left: Some(days),
            actual_price: Some(actual),
            predicted_price: Some(predicted),
            ..Record::default()
        }
    }

    fn fixture() -> Vec<Record> {
        vec![
            rec("RandomForestRegressor", "Vistara", ("Delhi", "Mumbai"), 1, 100.0, 110.0),
            rec("RandomForestRegressor", "Vistara", ("Delhi", "Mumbai"), 1, 300.0, 290.0),
            rec("RandomForestRegressor", "Indigo", ("Mumbai", "Chennai"), 3, 200.0, 180.0),
            rec("XGBRegressor", "Vistara", ("Delhi", "Mumbai"), 1, 200.0, 205.0),
            rec("XGBRegressor", "Indigo", ("Delhi", "Kolkata"), 2, 400.0, 420.0),
        ]
    }

    fn dataset<'a, X>(chart: &'a SeriesChart<X>, label: &str) -> &'a Dataset {
        chart
            .datasets
            .iter()
            .find(|d| d.label == label)
            .unwrap_or_else(|| panic!("no dataset '{}'", label))
    }

    #[test]
    fn test_days_left_comparison() {
        let chart = days_left_price_comparison(&fixture(), ColorTable::global());
        assert_eq!(chart.labels, vec![1, 2, 3]);

        let actual = dataset(&chart, ACTUAL_PRICE);
        assert_eq!(actual.color, ACTUAL_COLOR);
        assert_eq!(actual.data, vec![Some(200.0), Some(400.0), Some(200.0)]);

        let rf = dataset(&chart, "Predicted Price - RandomForestRegressor");
        assert_eq!(rf.color, "blue");
        assert_eq!(rf.data, vec![Some(200.0), None, Some(180.0)]);

        let xgb = dataset(&chart, "Predicted Price - XGBRegressor");
        assert_eq!(xgb.data, vec![Some(205.0), Some(420.0), None]);
    }

    #[test]
    fn test_model_performance_series_per_model() {
        let chart = model_performance_over_time(&fixture(), ColorTable::global());
        let labels: Vec<&str> = chart.datasets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["RandomForestRegressor", "XGBRegressor"]);
        assert_eq!(chart.datasets[1].color, "green");
    }

    #[test]
    fn test_average_price() {
        let chart = average_price_by_days_left(&fixture(), ColorTable::global());
        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].color, AVERAGE_COLOR);
        assert_eq!(chart.datasets[0].data[0], Some(200.0));
    }

    #[test]
    fn test_route_comparison_labels_sorted() {
        let chart = route_price_comparison(&fixture(), ColorTable::global());
        assert_eq!(
            chart.labels,
            vec!["Delhi-Kolkata", "Delhi-Mumbai", "Mumbai-Chennai"]
        );
        let rf = dataset(&chart, "RandomForestRegressor");
        assert_eq!(rf.data, vec![None, Some(200.0), Some(180.0)]);
    }

    #[test]
    fn test_top_routes_for_one_model() {
        let ranking = top_routes(&fixture(), "RandomForestRegressor", 1);
        assert_eq!(ranking.top[0].key, "Delhi-Mumbai");
        assert_eq!(ranking.bottom[0].key, "Mumbai-Chennai");
        assert!(top_routes(&fixture(), "NoSuchModel", 10).top.is_empty());
    }

    #[test]
    fn test_heatmaps_keep_missing_cells() {
        let heat = prediction_heatmap(&fixture(), "XGBRegressor");
        assert_eq!(heat.rows, vec!["Indigo", "Vistara"]);
        assert_eq!(heat.columns, vec![1, 2]);
        assert_eq!(heat.get(&"Indigo".to_string(), &1), None);

        let cities = city_pair_heatmap(&fixture());
        assert_eq!(cities.rows, vec!["Delhi", "Mumbai"]);
        assert_eq!(cities.get(&"Mumbai".to_string(), &"Mumbai".to_string()), None);
        assert_eq!(cities.get(&"Delhi".to_string(), &"Mumbai".to_string()), Some(200.0));
    }

    #[test]
    fn test_error_distribution_samples_but_summarizes_all() {
        let mut rng = StdRng::seed_from_u64(1);
        let chart = error_distribution(&fixture(), ColorTable::global(), 1, &mut rng);
        assert_eq!(chart.labels, vec!["RandomForestRegressor", "XGBRegressor"]);
        assert_eq!(chart.colors, vec!["blue", "green"]);
        assert!(chart.data.iter().all(|d| d.len() == 1));
        assert_eq!(chart.summaries[0].count, 3);
        assert_eq!(chart.summaries[1].count, 2);
    }

    #[test]
    fn test_price_distribution_by_airline() {
        let mut rng = StdRng::seed_from_u64(1);
        let chart = price_distribution(
            &fixture(),
            CategoryField::Airline,
            ColorTable::global(),
            100,
            &mut rng,
        );
        assert_eq!(chart.labels, vec!["Indigo", "Vistara"]);
        assert_eq!(chart.data[1], vec![100.0, 300.0, 200.0]);
        assert_eq!(chart.summaries[1].median, 200.0);
    }

    #[test]
    fn test_error_summary() {
        let summary = error_summary(&fixture());
        assert_eq!(summary["XGBRegressor"].mean, 12.5);
        assert_eq!(summary["RandomForestRegressor"].count, 3);
    }

    #[test]
    fn test_scatter_is_bounded() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(duration_scatter(&fixture(), 2, &mut rng).points.len(), 2);
        assert_eq!(duration_scatter(&fixture(), 50, &mut rng).points.len(), 5);
    }

    #[test]
    fn test_custom_series_split_by_model() {
        let key = parse_key_spec("days_left").unwrap();
        let by = parse_key_spec("model_name").unwrap();
        let chart = custom_series(&fixture(), &key, Field::PredictedPrice, Some(&by), ColorTable::global());
        assert_eq!(chart.labels, vec![AxisLabel::from(1u32), 2u32.into(), 3u32.into()]);
        assert_eq!(chart.datasets.len(), 2);

        let single = custom_series(&fixture(), &key, Field::ActualPrice, None, ColorTable::global());
        assert_eq!(single.datasets[0].label, "actual_price");
        assert_eq!(single.datasets[0].color, crate::palette::FALLBACK_COLOR);
    }

    #[test]
    fn test_custom_pivot() {
        let row = parse_key_spec("airline").unwrap();
        let col = parse_key_spec("days_left").unwrap();
        let pivot = custom_pivot(&fixture(), &row, &col, Field::ActualPrice);
        assert_eq!(pivot.get(&"Vistara".into(), &1u32.into()), Some(200.0));
        assert_eq!(pivot.get(&"Vistara".into(), &3u32.into()), None);
    }

    #[test]
    fn test_empty_input_everywhere() {
        let mut rng = StdRng::seed_from_u64(0);
        let colors = ColorTable::global();
        let days = days_left_price_comparison(&[], colors);
        assert!(days.labels.is_empty() && days.datasets.is_empty());
        assert!(route_price_comparison(&[], colors).datasets.is_empty());
        assert!(top_routes(&[], "x", 10).top.is_empty());
        assert!(city_pair_heatmap(&[]).rows.is_empty());
        assert!(error_distribution(&[], colors, 10, &mut rng).labels.is_empty());
        assert!(error_summary(&[]).is_empty());
        assert!(duration_scatter(&[], 10, &mut rng).points.is_empty());
    }
}
