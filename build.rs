fn main() {
    prost_build::compile_protos(&["proto/utxo.proto"], &["proto"]).expect("compile utxo.proto");
}
