// Routers mounted from one file and declared in another
use pretty_assertions::assert_eq;
use route_openapi::extractor::HttpMethod;
use route_openapi::generator::{generate, GenerationOptions};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_router_imported_from_sibling_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("routes")).unwrap();
    fs::create_dir_all(root.join("schemas")).unwrap();

    fs::write(
        root.join("main.ts"),
        r#"import { Application } from 'https://deno.land/x/oak/mod.ts';
import orders from './routes/orders.ts';

const app = new Application();
app.use('/orders', orders.routes());
"#,
    )
    .unwrap();
    fs::write(
        root.join("routes/orders.ts"),
        r#"import * as orderSchemas from '../schemas/order.schema.ts';

const router = new Router();

router.get('/:orderId', validatePath(orderSchemas.orderId), getOrder);

export default router;
"#,
    )
    .unwrap();
    fs::write(
        root.join("schemas/order.schema.yaml"),
        "orderId:\n  type: object\n  properties:\n    orderId:\n      type: string\n  required: [orderId]\n",
    )
    .unwrap();

    let options = GenerationOptions::new(root.join("main.ts"), root.join("schemas"));
    let model = generate(&options).unwrap();

    assert_eq!(model.len(), 1);
    let record = model.endpoint(HttpMethod::Get, "/orders/{orderId}").unwrap();
    assert_eq!(record.summary, "getOrder");
    assert_eq!(record.tag, "orders");
    assert!(record.request.path.as_ref().unwrap().is_required("orderId"));
}

#[test]
fn test_unresolvable_router_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("schemas")).unwrap();

    fs::write(
        root.join("main.ts"),
        r#"import { missing } from './missing.ts';

const health = new Router();
health.get('/', ping);

app.use('/missing', missing.routes());
app.use('/health', health.routes());
"#,
    )
    .unwrap();

    let options = GenerationOptions::new(root.join("main.ts"), root.join("schemas"));
    let model = generate(&options).unwrap();

    let paths: Vec<_> = model.endpoints().iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/health"]);
}
