fn main() {
    posehold_lib::run()
}
