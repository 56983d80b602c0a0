fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Prefer a system protoc; fall back to the vendored binary.
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()
            .map_err(|e| format!("no protoc available: {:?}", e))?;
        std::env::set_var("PROTOC", protoc);
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/coordinator.proto"], &["proto"])?;
    Ok(())
}
