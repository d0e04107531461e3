/// End-to-end exercises of the list view engine: filtering, paging,
/// column visibility and rendering working together the way the
/// management pages use them.
#[cfg(test)]
mod tests {
    use cva::domain::PagePolicy;
    use cva::records::{FieldCatalog, Record, Value};
    use cva::render::{NO_DATA_TEXT, TableSpec, formats, render_page};
    use cva::view::{FilterState, Pager, VisibleFields, filter_rows};

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(&[
            ("fullName", "Nombre completo"),
            ("phones", "Telefonos"),
            ("value", "Valor"),
        ])
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new(1)
                .with("fullName", Value::Text("Ana Gomez".into()))
                .with("phones", Value::List(vec!["3001112222".into()]))
                .with("value", Value::Number(150000.0)),
            Record::new(2)
                .with("fullName", Value::Text("Luis Ruiz".into()))
                .with("phones", Value::List(vec!["3003334444".into()]))
                .with("value", Value::Number(200000.0)),
        ]
    }

    fn spec() -> TableSpec {
        TableSpec::default()
            .with_labels(catalog().labels())
            .with_format("value", formats::currency)
    }

    #[test]
    fn name_filter_selects_one_record() {
        let records = records();
        let visible = VisibleFields::all(&catalog());
        let rows = filter_rows(&records, &FilterState::across_all("Ana"), &visible);
        assert_eq!(rows, vec![0]);

        let page_records: Vec<&Record> = rows.iter().map(|&i| &records[i]).collect();
        let page = render_page(&spec(), &visible, &page_records);
        assert_eq!(page.columns[0].data, vec!["Ana Gomez"]);
        assert_eq!(page.columns[2].data, vec!["$ 150.000"]);
    }

    #[test]
    fn phone_scope_matches_both_records() {
        let records = records();
        let cat = catalog();
        let visible = VisibleFields::all(&cat);
        let filter = FilterState::scoped("300", "phones", &cat).unwrap();
        let rows = filter_rows(&records, &filter, &visible);
        assert_eq!(rows, vec![0, 1]);
    }

    #[test]
    fn no_match_paginates_to_one_empty_page() {
        let records = records();
        let visible = VisibleFields::all(&catalog());
        let rows = filter_rows(&records, &FilterState::across_all("999"), &visible);
        assert!(rows.is_empty());

        let pager = Pager::new(10, PagePolicy::Clamp);
        assert_eq!(pager.total_pages(rows.len()), 1);
        assert!(pager.slice(&rows).is_empty());

        let page = render_page(&spec(), &visible, &[]);
        assert_eq!(page.placeholder.as_deref(), Some(NO_DATA_TEXT));
    }

    #[test]
    fn filter_then_page_then_render() {
        // 25 records, every fifth one for "Gomez".
        let records: Vec<Record> = (0..25)
            .map(|i| {
                let surname = if i % 5 == 0 { "Gomez" } else { "Ruiz" };
                Record::new(i as u64)
                    .with("fullName", Value::Text(format!("Person {i} {surname}")))
                    .with("value", Value::Number(1000.0 * i as f64))
            })
            .collect();
        let visible = VisibleFields::all(&catalog());

        let all = filter_rows(&records, &FilterState::across_all(""), &visible);
        assert_eq!(all.len(), 25);

        let mut pager = Pager::new(10, PagePolicy::Clamp);
        assert_eq!(pager.total_pages(all.len()), 3);
        pager.set_page(3, all.len());
        assert_eq!(pager.slice(&all), &[20, 21, 22, 23, 24]);

        // Filter change: caller resets the pager.
        let gomez = filter_rows(&records, &FilterState::across_all("gomez"), &visible);
        assert_eq!(gomez.len(), 5);
        pager.reset();
        assert_eq!(pager.current(), 1);

        let page_records: Vec<&Record> = pager.slice(&gomez).iter().map(|&i| &records[i]).collect();
        let page = render_page(&spec(), &visible, &page_records);
        assert_eq!(page.columns[0].data.len(), 5);
        assert_eq!(page.columns[0].data[1], "Person 5 Gomez");
    }

    #[test]
    fn hiding_a_column_narrows_all_scope_and_rendering() {
        let records = records();
        let cat = catalog();
        let mut visible = VisibleFields::all(&cat);
        visible.toggle("phones");

        // The phone digits are only in the hidden column now.
        let rows = filter_rows(&records, &FilterState::across_all("3001"), &visible);
        assert!(rows.is_empty());

        let everyone = filter_rows(&records, &FilterState::across_all(""), &visible);
        let page_records: Vec<&Record> = everyone.iter().map(|&i| &records[i]).collect();
        let page = render_page(&spec(), &visible, &page_records);
        let names: Vec<&str> = page.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Nombre completo", "Valor"]);
    }
}
